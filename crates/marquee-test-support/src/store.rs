//! In-memory store fakes honoring the conditional-update contract.
//!
//! The seat store evaluates `SeatGuard` under a single mutex, which gives
//! the same per-row atomicity a real store provides. Tests seed rows
//! directly and inspect them after engine calls.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::booking::{BookingRow, BookingStatus, PaymentStatus};
use marquee_core::error::BookingError;
use marquee_core::seat::{SeatGuard, SeatRow, SeatState, SeatUpdate};
use marquee_core::store::{BookingStore, SeatStore};
use uuid::Uuid;

/// In-memory `SeatStore`.
#[derive(Debug, Default)]
pub struct InMemorySeatStore {
    rows: Mutex<HashMap<Uuid, SeatRow>>,
}

impl InMemorySeatStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a seat row, replacing any previous row with the same ID.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, row: SeatRow) {
        self.rows.lock().unwrap().insert(row.id, row);
    }

    /// Snapshot of a single seat row for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn row(&self, seat_id: Uuid) -> Option<SeatRow> {
        self.rows.lock().unwrap().get(&seat_id).cloned()
    }
}

#[async_trait]
impl SeatStore for InMemorySeatStore {
    async fn seats(&self, show_id: Uuid, seat_ids: &[Uuid]) -> Result<Vec<SeatRow>, BookingError> {
        let rows = self.rows.lock().unwrap();
        Ok(seat_ids
            .iter()
            .filter_map(|id| rows.get(id))
            .filter(|row| row.show_id == show_id)
            .cloned()
            .collect())
    }

    async fn seats_for_show(&self, show_id: Uuid) -> Result<Vec<SeatRow>, BookingError> {
        let rows = self.rows.lock().unwrap();
        let mut seats: Vec<SeatRow> = rows
            .values()
            .filter(|row| row.show_id == show_id)
            .cloned()
            .collect();
        seats.sort_by_key(|row| row.id);
        Ok(seats)
    }

    async fn conditional_update(
        &self,
        seat_id: Uuid,
        guard: SeatGuard,
        new_state: SeatState,
        updated_at: DateTime<Utc>,
    ) -> Result<SeatUpdate, BookingError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&seat_id) else {
            return Ok(SeatUpdate {
                applied: false,
                current: None,
            });
        };
        if guard.matches(&row.state) {
            row.state = new_state;
            row.updated_at = updated_at;
            Ok(SeatUpdate {
                applied: true,
                current: Some(row.clone()),
            })
        } else {
            Ok(SeatUpdate {
                applied: false,
                current: Some(row.clone()),
            })
        }
    }

    async fn expired_locks(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<SeatRow>, BookingError> {
        let rows = self.rows.lock().unwrap();
        let mut expired: Vec<SeatRow> = rows
            .values()
            .filter(|row| matches!(row.state, SeatState::Locked { until, .. } if until <= now))
            .cloned()
            .collect();
        expired.sort_by_key(|row| row.id);
        expired.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(expired)
    }
}

/// In-memory `BookingStore`.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    rows: Mutex<HashMap<Uuid, BookingRow>>,
}

impl InMemoryBookingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a single booking row for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn row(&self, booking_id: Uuid) -> Option<BookingRow> {
        self.rows.lock().unwrap().get(&booking_id).cloned()
    }

    /// Number of stored bookings.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Whether the store holds no bookings.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, row: BookingRow) -> Result<(), BookingError> {
        self.rows.lock().unwrap().insert(row.id, row);
        Ok(())
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Option<BookingRow>, BookingError> {
        Ok(self.rows.lock().unwrap().get(&booking_id).cloned())
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingRow>, BookingError> {
        let rows = self.rows.lock().unwrap();
        let mut bookings: Vec<BookingRow> = rows
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn bookings_for_show(&self, show_id: Uuid) -> Result<Vec<BookingRow>, BookingError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|row| row.show_id == show_id)
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new: BookingStatus,
        payment_status: Option<PaymentStatus>,
        payment_ref: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&booking_id) else {
            return Ok(false);
        };
        if row.status != expected {
            return Ok(false);
        }
        row.status = new;
        if let Some(payment) = payment_status {
            row.payment_status = payment;
        }
        if payment_ref.is_some() {
            row.payment_ref = payment_ref;
        }
        row.updated_at = updated_at;
        Ok(true)
    }

    async fn update_payment(
        &self,
        booking_id: Uuid,
        payment_status: PaymentStatus,
        payment_ref: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&booking_id) else {
            return Ok(false);
        };
        row.payment_status = payment_status;
        if payment_ref.is_some() {
            row.payment_ref = payment_ref;
        }
        row.updated_at = updated_at;
        Ok(true)
    }

    async fn expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<BookingRow>, BookingError> {
        let rows = self.rows.lock().unwrap();
        let mut expired: Vec<BookingRow> = rows
            .values()
            .filter(|row| row.status == BookingStatus::Pending && row.expires_at <= now)
            .cloned()
            .collect();
        expired.sort_by_key(|row| row.id);
        expired.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(expired)
    }
}

/// A booking store whose every call fails with a store error. Useful
/// for testing degraded-infrastructure paths such as the health probe.
#[derive(Debug)]
pub struct FailingBookingStore;

#[async_trait]
impl BookingStore for FailingBookingStore {
    async fn insert(&self, _row: BookingRow) -> Result<(), BookingError> {
        Err(BookingError::Store("connection refused".into()))
    }

    async fn booking(&self, _booking_id: Uuid) -> Result<Option<BookingRow>, BookingError> {
        Err(BookingError::Store("connection refused".into()))
    }

    async fn bookings_for_user(&self, _user_id: Uuid) -> Result<Vec<BookingRow>, BookingError> {
        Err(BookingError::Store("connection refused".into()))
    }

    async fn bookings_for_show(&self, _show_id: Uuid) -> Result<Vec<BookingRow>, BookingError> {
        Err(BookingError::Store("connection refused".into()))
    }

    async fn transition(
        &self,
        _booking_id: Uuid,
        _expected: BookingStatus,
        _new: BookingStatus,
        _payment_status: Option<PaymentStatus>,
        _payment_ref: Option<String>,
        _updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        Err(BookingError::Store("connection refused".into()))
    }

    async fn update_payment(
        &self,
        _booking_id: Uuid,
        _payment_status: PaymentStatus,
        _payment_ref: Option<String>,
        _updated_at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        Err(BookingError::Store("connection refused".into()))
    }

    async fn expired_pending(
        &self,
        _now: DateTime<Utc>,
        _limit: i64,
    ) -> Result<Vec<BookingRow>, BookingError> {
        Err(BookingError::Store("connection refused".into()))
    }
}
