//! `PostgreSQL` implementation of the `SeatStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use marquee_core::error::BookingError;
use marquee_core::seat::{SeatGuard, SeatRow, SeatState, SeatUpdate};
use marquee_core::store::SeatStore;

const SEAT_COLUMNS: &str = "id, show_id, status, holder_booking_id, locked_until, price, updated_at";

/// PostgreSQL-backed seat store.
#[derive(Debug, Clone)]
pub struct PgSeatStore {
    pool: PgPool,
}

impl PgSeatStore {
    /// Creates a new `PgSeatStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a seat row. Used when a show is scheduled, not by the
    /// engine.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Store` on database failure.
    pub async fn insert(&self, row: &SeatRow) -> Result<(), BookingError> {
        let (status, holder, locked_until) = state_columns(&row.state);
        sqlx::query(
            "INSERT INTO show_seats (id, show_id, status, holder_booking_id, locked_until, price, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.id)
        .bind(row.show_id)
        .bind(status)
        .bind(holder)
        .bind(locked_until)
        .bind(row.price)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn fetch(&self, seat_id: Uuid) -> Result<Option<SeatRow>, BookingError> {
        let record = sqlx::query_as::<_, SeatRecord>(&format!(
            "SELECT {SEAT_COLUMNS} FROM show_seats WHERE id = $1"
        ))
        .bind(seat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        record.map(SeatRecord::into_row).transpose()
    }
}

#[async_trait]
impl SeatStore for PgSeatStore {
    async fn seats(&self, show_id: Uuid, seat_ids: &[Uuid]) -> Result<Vec<SeatRow>, BookingError> {
        let records = sqlx::query_as::<_, SeatRecord>(&format!(
            "SELECT {SEAT_COLUMNS} FROM show_seats
             WHERE show_id = $1 AND id = ANY($2)
             ORDER BY id"
        ))
        .bind(show_id)
        .bind(seat_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        records.into_iter().map(SeatRecord::into_row).collect()
    }

    async fn seats_for_show(&self, show_id: Uuid) -> Result<Vec<SeatRow>, BookingError> {
        let records = sqlx::query_as::<_, SeatRecord>(&format!(
            "SELECT {SEAT_COLUMNS} FROM show_seats WHERE show_id = $1 ORDER BY id"
        ))
        .bind(show_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        records.into_iter().map(SeatRecord::into_row).collect()
    }

    async fn conditional_update(
        &self,
        seat_id: Uuid,
        guard: SeatGuard,
        new_state: SeatState,
        updated_at: DateTime<Utc>,
    ) -> Result<SeatUpdate, BookingError> {
        let (status, holder, locked_until) = state_columns(&new_state);

        let updated = match guard {
            SeatGuard::Lockable { now } => {
                sqlx::query_as::<_, SeatRecord>(&format!(
                    "UPDATE show_seats
                     SET status = $2, holder_booking_id = $3, locked_until = $4, updated_at = $5
                     WHERE id = $1
                       AND (status = 'AVAILABLE'
                            OR (status = 'LOCKED' AND locked_until <= $6))
                     RETURNING {SEAT_COLUMNS}"
                ))
                .bind(seat_id)
                .bind(status)
                .bind(holder)
                .bind(locked_until)
                .bind(updated_at)
                .bind(now)
                .fetch_optional(&self.pool)
                .await
            }
            SeatGuard::LockedBy(booking_id) => {
                sqlx::query_as::<_, SeatRecord>(&format!(
                    "UPDATE show_seats
                     SET status = $2, holder_booking_id = $3, locked_until = $4, updated_at = $5
                     WHERE id = $1 AND status = 'LOCKED' AND holder_booking_id = $6
                     RETURNING {SEAT_COLUMNS}"
                ))
                .bind(seat_id)
                .bind(status)
                .bind(holder)
                .bind(locked_until)
                .bind(updated_at)
                .bind(booking_id)
                .fetch_optional(&self.pool)
                .await
            }
            SeatGuard::BookedBy(booking_id) => {
                sqlx::query_as::<_, SeatRecord>(&format!(
                    "UPDATE show_seats
                     SET status = $2, holder_booking_id = $3, locked_until = $4, updated_at = $5
                     WHERE id = $1 AND status = 'BOOKED' AND holder_booking_id = $6
                     RETURNING {SEAT_COLUMNS}"
                ))
                .bind(seat_id)
                .bind(status)
                .bind(holder)
                .bind(locked_until)
                .bind(updated_at)
                .bind(booking_id)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(store_error)?;

        match updated {
            Some(record) => Ok(SeatUpdate {
                applied: true,
                current: Some(record.into_row()?),
            }),
            None => Ok(SeatUpdate {
                applied: false,
                current: self.fetch(seat_id).await?,
            }),
        }
    }

    async fn expired_locks(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<SeatRow>, BookingError> {
        let records = sqlx::query_as::<_, SeatRecord>(&format!(
            "SELECT {SEAT_COLUMNS} FROM show_seats
             WHERE status = 'LOCKED' AND locked_until <= $1
             ORDER BY show_id, id
             LIMIT $2"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        records.into_iter().map(SeatRecord::into_row).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SeatRecord {
    id: Uuid,
    show_id: Uuid,
    status: String,
    holder_booking_id: Option<Uuid>,
    locked_until: Option<DateTime<Utc>>,
    price: Decimal,
    updated_at: DateTime<Utc>,
}

impl SeatRecord {
    fn into_row(self) -> Result<SeatRow, BookingError> {
        let state = match (self.status.as_str(), self.holder_booking_id, self.locked_until) {
            ("AVAILABLE", _, _) => SeatState::Available,
            ("LOCKED", Some(holder), Some(until)) => SeatState::Locked { holder, until },
            ("BOOKED", Some(holder), _) => SeatState::Booked { holder },
            ("MAINTENANCE", _, _) => SeatState::Maintenance,
            (status, holder, until) => {
                return Err(BookingError::Store(format!(
                    "corrupt seat row {}: status={status} holder={holder:?} locked_until={until:?}",
                    self.id
                )));
            }
        };
        Ok(SeatRow {
            id: self.id,
            show_id: self.show_id,
            price: self.price,
            state,
            updated_at: self.updated_at,
        })
    }
}

fn state_columns(state: &SeatState) -> (&'static str, Option<Uuid>, Option<DateTime<Utc>>) {
    match state {
        SeatState::Available => ("AVAILABLE", None, None),
        SeatState::Locked { holder, until } => ("LOCKED", Some(*holder), Some(*until)),
        SeatState::Booked { holder } => ("BOOKED", Some(*holder), None),
        SeatState::Maintenance => ("MAINTENANCE", None, None),
    }
}

fn store_error(error: sqlx::Error) -> BookingError {
    BookingError::Store(error.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use marquee_core::seat::SeatState;

    use super::{SeatRecord, state_columns};

    fn record(status: &str, holder: Option<Uuid>, locked: bool) -> SeatRecord {
        let until = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        SeatRecord {
            id: Uuid::new_v4(),
            show_id: Uuid::new_v4(),
            status: status.to_owned(),
            holder_booking_id: holder,
            locked_until: locked.then_some(until),
            price: Decimal::from(100),
            updated_at: until,
        }
    }

    #[test]
    fn test_record_round_trips_every_state() {
        let holder = Uuid::new_v4();
        let until = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();

        let cases = [
            SeatState::Available,
            SeatState::Locked { holder, until },
            SeatState::Booked { holder },
            SeatState::Maintenance,
        ];
        for state in cases {
            let (status, holder_col, until_col) = state_columns(&state);
            let mut rec = record(status, holder_col, false);
            rec.locked_until = until_col;
            assert_eq!(rec.into_row().unwrap().state, state);
        }
    }

    #[test]
    fn test_locked_record_without_holder_is_rejected() {
        let rec = record("LOCKED", None, true);
        assert!(rec.into_row().is_err());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let rec = record("ON_FIRE", None, false);
        assert!(rec.into_row().is_err());
    }
}
