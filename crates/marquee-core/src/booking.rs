//! Booking domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a booking.
///
/// `Confirmed`, `Cancelled`, and `Expired` are absorbing: once entered,
/// no further booking-status transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Seats soft-locked, awaiting payment and confirmation.
    Pending,
    /// Paid and hard-booked.
    Confirmed,
    /// Cancelled by the owner (or rolled back by the engine).
    Cancelled,
    /// Reclaimed by the reaper after the seat lock lapsed.
    Expired,
}

impl BookingStatus {
    /// Whether this status is absorbing.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled | Self::Expired)
    }
}

/// Payment lifecycle of a booking, written by the payment coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No payment attempt yet.
    Pending,
    /// A gateway charge is in flight.
    Processing,
    /// The gateway approved the charge.
    Completed,
    /// The gateway declined, or retries were exhausted.
    Failed,
    /// A completed charge was refunded.
    Refunded,
}

/// Persistent record of one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRow {
    /// Surrogate booking identifier.
    pub id: Uuid,
    /// The user who initiated the booking.
    pub user_id: Uuid,
    /// The show the seats belong to.
    pub show_id: Uuid,
    /// The reserved seats, in request order. Never empty.
    pub seat_ids: Vec<Uuid>,
    /// Sum of the seat prices.
    pub total_amount: Decimal,
    /// Booking lifecycle state.
    pub status: BookingStatus,
    /// Payment lifecycle state.
    pub payment_status: PaymentStatus,
    /// Gateway transaction reference, once a charge completed.
    pub payment_ref: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the seat soft-locks lapse.
    pub expires_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BookingRow {
    /// Builds a fresh `Pending` booking expiring `lock_duration` from `now`.
    #[must_use]
    pub fn pending(
        user_id: Uuid,
        show_id: Uuid,
        seat_ids: Vec<Uuid>,
        total_amount: Decimal,
        now: DateTime<Utc>,
        lock_duration: chrono::Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            show_id,
            seat_ids,
            total_amount,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_ref: None,
            created_at: now,
            expires_at: now + lock_duration,
            updated_at: now,
        }
    }

    /// Whether the seat soft-locks have lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
