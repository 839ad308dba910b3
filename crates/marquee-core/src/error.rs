//! Domain error taxonomy for the reservation engine.

use thiserror::Error;
use uuid::Uuid;

use crate::booking::BookingStatus;

/// Top-level error type surfaced by the reservation core.
///
/// Store and gateway failures are wrapped into this taxonomy at the point
/// they occur; the engine itself never retries and never swallows errors.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The show does not exist in the catalog.
    #[error("show not found: {0}")]
    ShowNotFound(Uuid),

    /// The booking does not exist.
    #[error("booking not found: {0}")]
    BookingNotFound(Uuid),

    /// One or more requested seats do not exist for the show.
    #[error("seats not found for show {show_id}: {seat_ids:?}")]
    SeatsNotFound {
        /// The show the request targeted.
        show_id: Uuid,
        /// The seat IDs that had no row.
        seat_ids: Vec<Uuid>,
    },

    /// One or more requested seats are booked or freshly locked.
    /// All-or-nothing: no seat was touched.
    #[error("seats unavailable: {failed_seat_ids:?}")]
    SeatsUnavailable {
        /// The offending seat IDs.
        failed_seat_ids: Vec<Uuid>,
    },

    /// A conditional update lost a race with another writer. All partial
    /// effects have been rolled back; callers may retry once.
    #[error("seat locking lost a race with a concurrent writer")]
    Conflict,

    /// The booking is already confirmed.
    #[error("booking {0} is already confirmed")]
    AlreadyConfirmed(Uuid),

    /// The booking is in a terminal state and cannot transition further.
    #[error("booking {booking_id} is in terminal state {status:?}")]
    Terminal {
        /// The booking in question.
        booking_id: Uuid,
        /// Its terminal status.
        status: BookingStatus,
    },

    /// The pending booking's seat lock elapsed before confirmation.
    #[error("booking {0} expired before confirmation")]
    Expired(Uuid),

    /// Business rule forbids cancellation (e.g. show starts within the
    /// grace window).
    #[error("booking {booking_id} cannot be cancelled: {reason}")]
    NotCancellable {
        /// The booking in question.
        booking_id: Uuid,
        /// Human-readable rule that blocked the cancellation.
        reason: String,
    },

    /// The caller is not the owner of the booking.
    #[error("user {user_id} is not the owner of booking {booking_id}")]
    Unauthorized {
        /// The booking in question.
        booking_id: Uuid,
        /// The caller.
        user_id: Uuid,
    },

    /// The caller's deadline elapsed. No partial effect remains.
    #[error("caller deadline elapsed before the operation completed")]
    Timeout,

    /// Malformed request (empty seat list, duplicate seats, show already
    /// started).
    #[error("validation error: {0}")]
    Validation(String),

    /// A state the engine's invariants rule out was observed. Fatal and
    /// non-retriable; logged with full context at the point of detection.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// An infrastructure/persistence error.
    #[error("store error: {0}")]
    Store(String),
}
