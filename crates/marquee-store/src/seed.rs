//! Seeding helpers for scheduling a show.
//!
//! Creating a show means creating one AVAILABLE seat row per physical
//! seat with the multiplier-adjusted price. The reservation engine never
//! creates or destroys seats.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use marquee_core::error::BookingError;
use marquee_core::seat::{SeatRow, SeatState};
use marquee_core::show::ShowInfo;

use crate::pg_seat_store::PgSeatStore;
use crate::pg_show_catalog::PgShowCatalog;

/// Inserts a show and its seat rows, one per entry in `seat_prices`.
/// Returns the new seat IDs in input order.
///
/// # Errors
///
/// Returns `BookingError::Store` on database failure.
pub async fn schedule_show(
    pool: &PgPool,
    show: &ShowInfo,
    seat_prices: &[Decimal],
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>, BookingError> {
    PgShowCatalog::new(pool.clone()).insert(show).await?;

    let seats = PgSeatStore::new(pool.clone());
    let mut seat_ids = Vec::with_capacity(seat_prices.len());
    for price in seat_prices {
        let row = SeatRow {
            id: Uuid::new_v4(),
            show_id: show.id,
            price: *price,
            state: SeatState::Available,
            updated_at: now,
        };
        seats.insert(&row).await?;
        seat_ids.push(row.id);
    }
    Ok(seat_ids)
}
