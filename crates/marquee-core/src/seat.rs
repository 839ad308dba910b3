//! Show-seat domain types.
//!
//! A show-seat is a single bookable unit for one show, distinct from the
//! physical seat in the screen. Its state is a sum type so that a holder
//! or lock expiry can only exist in the variants where they are
//! meaningful.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a show-seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeatState {
    /// Free for locking.
    Available,
    /// Soft-locked by a pending booking until `until`.
    Locked {
        /// The pending booking holding the lock.
        holder: Uuid,
        /// When the soft lock lapses.
        until: DateTime<Utc>,
    },
    /// Hard-booked by a confirmed booking.
    Booked {
        /// The confirmed booking holding the seat.
        holder: Uuid,
    },
    /// Taken out of service; never bookable.
    Maintenance,
}

impl SeatState {
    /// Whether the seat counts as available at `now`.
    ///
    /// A locked seat whose hold has lapsed is treated as available by
    /// readers; only the engine and the reaper actually mutate it.
    #[must_use]
    pub fn is_effectively_available(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Available => true,
            Self::Locked { until, .. } => *until <= now,
            Self::Booked { .. } | Self::Maintenance => false,
        }
    }

    /// The booking currently holding this seat, if any.
    #[must_use]
    pub fn holder(&self) -> Option<Uuid> {
        match self {
            Self::Locked { holder, .. } | Self::Booked { holder } => Some(*holder),
            Self::Available | Self::Maintenance => None,
        }
    }
}

/// Persistent record of one show-seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRow {
    /// Surrogate seat identifier, unique per (show, physical seat).
    pub id: Uuid,
    /// The show this seat belongs to.
    pub show_id: Uuid,
    /// Price for this seat, seat-type multiplier already baked in at show
    /// creation.
    pub price: Decimal,
    /// Current state.
    pub state: SeatState,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Predicate a conditional seat update is guarded by.
///
/// The store must evaluate the guard and apply the write atomically per
/// row; this is the primitive the anti-double-booking guarantees rest on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatGuard {
    /// Available, or locked with a hold that lapsed at or before `now`.
    Lockable {
        /// The instant staleness is judged against.
        now: DateTime<Utc>,
    },
    /// Locked and held by the given booking.
    LockedBy(Uuid),
    /// Booked and held by the given booking.
    BookedBy(Uuid),
}

impl SeatGuard {
    /// Evaluates the guard against a seat state.
    ///
    /// In-process stores use this directly; the SQL store expresses the
    /// same predicate in its `WHERE` clause.
    #[must_use]
    pub fn matches(&self, state: &SeatState) -> bool {
        match (self, state) {
            (Self::Lockable { .. }, SeatState::Available) => true,
            (Self::Lockable { now }, SeatState::Locked { until, .. }) => *until <= *now,
            (Self::LockedBy(holder), SeatState::Locked { holder: h, .. }) => h == holder,
            (Self::BookedBy(holder), SeatState::Booked { holder: h }) => h == holder,
            _ => false,
        }
    }
}

/// Result of a conditional seat update.
#[derive(Debug, Clone)]
pub struct SeatUpdate {
    /// Whether the guard held and the write was applied.
    pub applied: bool,
    /// The row as observed after the attempt (present when the row
    /// exists; useful for diagnostics when the guard failed).
    pub current: Option<SeatRow>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::{SeatGuard, SeatState};

    #[test]
    fn test_stale_lock_is_effectively_available() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let stale = SeatState::Locked {
            holder: Uuid::new_v4(),
            until: now - chrono::Duration::seconds(1),
        };
        let fresh = SeatState::Locked {
            holder: Uuid::new_v4(),
            until: now + chrono::Duration::minutes(5),
        };

        assert!(stale.is_effectively_available(now));
        assert!(!fresh.is_effectively_available(now));
        assert!(SeatState::Available.is_effectively_available(now));
        assert!(!SeatState::Maintenance.is_effectively_available(now));
    }

    #[test]
    fn test_lockable_guard_admits_available_and_stale_locks_only() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let guard = SeatGuard::Lockable { now };

        assert!(guard.matches(&SeatState::Available));
        assert!(guard.matches(&SeatState::Locked {
            holder: Uuid::new_v4(),
            until: now,
        }));
        assert!(!guard.matches(&SeatState::Locked {
            holder: Uuid::new_v4(),
            until: now + chrono::Duration::seconds(1),
        }));
        assert!(!guard.matches(&SeatState::Booked {
            holder: Uuid::new_v4(),
        }));
        assert!(!guard.matches(&SeatState::Maintenance));
    }

    #[test]
    fn test_holder_guards_require_matching_booking() {
        let booking = Uuid::new_v4();
        let other = Uuid::new_v4();
        let until = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();

        let locked = SeatState::Locked {
            holder: booking,
            until,
        };
        assert!(SeatGuard::LockedBy(booking).matches(&locked));
        assert!(!SeatGuard::LockedBy(other).matches(&locked));
        assert!(!SeatGuard::BookedBy(booking).matches(&locked));

        let booked = SeatState::Booked { holder: booking };
        assert!(SeatGuard::BookedBy(booking).matches(&booked));
        assert!(!SeatGuard::BookedBy(other).matches(&booked));
        assert!(!SeatGuard::LockedBy(booking).matches(&booked));
    }
}
