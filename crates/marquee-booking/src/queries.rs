//! Read-only projections: seat availability, booking views, occupancy,
//! revenue, and per-user statistics.
//!
//! Readers report a lapsed lock as available but never mutate it;
//! reclamation is the reaper's job. Aggregates are eventually consistent
//! and carry no correctness weight.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use marquee_core::booking::{BookingRow, BookingStatus, PaymentStatus};
use marquee_core::clock::Clock;
use marquee_core::error::BookingError;
use marquee_core::seat::SeatState;
use marquee_core::store::{BookingStore, SeatStore};

/// One bookable seat as seen by a client choosing seats.
#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    /// The seat identifier to pass to `initiate_booking`.
    pub seat_id: Uuid,
    /// Price for this seat.
    pub price: Decimal,
}

/// Per-status seat counts for a show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    /// All seats of the show.
    pub total: usize,
    /// Effectively available (lapsed locks included).
    pub available: usize,
    /// Freshly locked.
    pub locked: usize,
    /// Hard-booked.
    pub booked: usize,
    /// Out of service.
    pub maintenance: usize,
}

/// Read-only projection of a booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    /// Booking identifier.
    pub booking_id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// The show booked.
    pub show_id: Uuid,
    /// Reserved seats, in request order.
    pub seat_ids: Vec<Uuid>,
    /// Sum of the seat prices.
    pub total_amount: Decimal,
    /// Booking lifecycle state.
    pub status: BookingStatus,
    /// Payment lifecycle state.
    pub payment_status: PaymentStatus,
    /// Gateway transaction reference, if any.
    pub payment_ref: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the seat holds lapse.
    pub expires_at: DateTime<Utc>,
}

impl From<BookingRow> for BookingView {
    fn from(row: BookingRow) -> Self {
        Self {
            booking_id: row.id,
            user_id: row.user_id,
            show_id: row.show_id,
            seat_ids: row.seat_ids,
            total_amount: row.total_amount,
            status: row.status,
            payment_status: row.payment_status,
            payment_ref: row.payment_ref,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// Aggregate statistics for one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    /// Bookings ever initiated, any state.
    pub booking_count: usize,
    /// Sum of confirmed booking totals.
    pub total_spent: Decimal,
}

/// Seats of a show whose effective status is AVAILABLE.
///
/// # Errors
///
/// Propagates store failures.
pub async fn available_seats(
    seats: &dyn SeatStore,
    clock: &dyn Clock,
    show_id: Uuid,
) -> Result<Vec<SeatView>, BookingError> {
    let now = clock.now();
    let rows = seats.seats_for_show(show_id).await?;
    Ok(rows
        .into_iter()
        .filter(|row| row.state.is_effectively_available(now))
        .map(|row| SeatView {
            seat_id: row.id,
            price: row.price,
        })
        .collect())
}

/// Per-status seat counts for a show, lapsed locks counted as available.
///
/// # Errors
///
/// Propagates store failures.
pub async fn show_occupancy(
    seats: &dyn SeatStore,
    clock: &dyn Clock,
    show_id: Uuid,
) -> Result<OccupancySummary, BookingError> {
    let now = clock.now();
    let rows = seats.seats_for_show(show_id).await?;
    let mut summary = OccupancySummary {
        total: rows.len(),
        ..OccupancySummary::default()
    };
    for row in rows {
        match row.state {
            SeatState::Available => summary.available += 1,
            SeatState::Locked { until, .. } if until <= now => summary.available += 1,
            SeatState::Locked { .. } => summary.locked += 1,
            SeatState::Booked { .. } => summary.booked += 1,
            SeatState::Maintenance => summary.maintenance += 1,
        }
    }
    Ok(summary)
}

/// Sum of confirmed booking totals for a show.
///
/// # Errors
///
/// Propagates store failures.
pub async fn show_revenue(
    bookings: &dyn BookingStore,
    show_id: Uuid,
) -> Result<Decimal, BookingError> {
    let rows = bookings.bookings_for_show(show_id).await?;
    Ok(rows
        .iter()
        .filter(|row| row.status == BookingStatus::Confirmed)
        .map(|row| row.total_amount)
        .sum())
}

/// A single booking by ID.
///
/// # Errors
///
/// `BookingNotFound` when the ID is unknown.
pub async fn booking_view(
    bookings: &dyn BookingStore,
    booking_id: Uuid,
) -> Result<BookingView, BookingError> {
    bookings
        .booking(booking_id)
        .await?
        .map(BookingView::from)
        .ok_or(BookingError::BookingNotFound(booking_id))
}

/// A user's booking history, newest first.
///
/// # Errors
///
/// Propagates store failures.
pub async fn user_bookings(
    bookings: &dyn BookingStore,
    user_id: Uuid,
) -> Result<Vec<BookingView>, BookingError> {
    let rows = bookings.bookings_for_user(user_id).await?;
    Ok(rows.into_iter().map(BookingView::from).collect())
}

/// Booking count and confirmed spend for a user.
///
/// # Errors
///
/// Propagates store failures.
pub async fn user_stats(
    bookings: &dyn BookingStore,
    user_id: Uuid,
) -> Result<UserStats, BookingError> {
    let rows = bookings.bookings_for_user(user_id).await?;
    let total_spent = rows
        .iter()
        .filter(|row| row.status == BookingStatus::Confirmed)
        .map(|row| row.total_amount)
        .sum();
    Ok(UserStats {
        booking_count: rows.len(),
        total_spent,
    })
}
