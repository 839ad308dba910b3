//! Store abstractions for seats and bookings.
//!
//! Both stores must provide per-row atomic conditional updates; a full
//! transaction spanning seats and bookings is not required. The engine
//! and the reaper rely on the guard predicates as the second line of
//! defense against races from other processes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{BookingRow, BookingStatus, PaymentStatus};
use crate::error::BookingError;
use crate::seat::{SeatGuard, SeatRow, SeatState, SeatUpdate};

/// Persistent store of show-seat rows.
#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Loads the given seats of a show in a single read. Seats unknown to
    /// the store are simply absent from the result.
    async fn seats(&self, show_id: Uuid, seat_ids: &[Uuid]) -> Result<Vec<SeatRow>, BookingError>;

    /// Loads every seat of a show.
    async fn seats_for_show(&self, show_id: Uuid) -> Result<Vec<SeatRow>, BookingError>;

    /// Applies `new_state` to the seat iff `guard` holds, atomically for
    /// this row. Returns whether the write was applied and the row as
    /// observed after the attempt.
    async fn conditional_update(
        &self,
        seat_id: Uuid,
        guard: SeatGuard,
        new_state: SeatState,
        updated_at: DateTime<Utc>,
    ) -> Result<SeatUpdate, BookingError>;

    /// Selects up to `limit` seats whose soft lock lapsed at or before
    /// `now`.
    async fn expired_locks(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<SeatRow>, BookingError>;
}

/// Persistent store of booking rows.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a new booking row.
    async fn insert(&self, row: BookingRow) -> Result<(), BookingError>;

    /// Fetches a booking by ID, `None` when unknown.
    async fn booking(&self, booking_id: Uuid) -> Result<Option<BookingRow>, BookingError>;

    /// All bookings of a user, newest first.
    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingRow>, BookingError>;

    /// All bookings against a show.
    async fn bookings_for_show(&self, show_id: Uuid) -> Result<Vec<BookingRow>, BookingError>;

    /// Transitions the booking's status iff it currently equals
    /// `expected`, optionally co-writing the payment fields in the same
    /// atomic update. Returns whether the write was applied.
    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new: BookingStatus,
        payment_status: Option<PaymentStatus>,
        payment_ref: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError>;

    /// Updates only the payment fields, leaving the booking status
    /// untouched. This is the payment coordinator's write path. Returns
    /// whether the row existed.
    async fn update_payment(
        &self,
        booking_id: Uuid,
        payment_status: PaymentStatus,
        payment_ref: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError>;

    /// Selects up to `limit` PENDING bookings whose expiry lapsed at or
    /// before `now`.
    async fn expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<BookingRow>, BookingError>;
}
