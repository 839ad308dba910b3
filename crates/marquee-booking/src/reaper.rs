//! Expiry reaper — background reclamation of lapsed holds.
//!
//! A single long-lived task runs two passes on every tick: releasing
//! seats whose soft lock lapsed, then transitioning lapsed PENDING
//! bookings to EXPIRED and releasing whatever seats they still hold.
//! Both passes key every write on the observed state, so re-running a
//! pass (or racing a concurrent engine call) converges to the same end
//! state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use marquee_core::booking::BookingStatus;
use marquee_core::clock::Clock;
use marquee_core::config::BookingConfig;
use marquee_core::error::BookingError;
use marquee_core::seat::{SeatGuard, SeatRow, SeatState};
use marquee_core::store::{BookingStore, SeatStore};

use crate::lock_registry::ShowLockRegistry;

/// What a single reaper pass accomplished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaperReport {
    /// Stale seat locks released in pass A.
    pub seats_released: usize,
    /// PENDING bookings transitioned to EXPIRED in pass B.
    pub bookings_expired: usize,
}

/// The background reclamation task.
pub struct ExpiryReaper {
    seats: Arc<dyn SeatStore>,
    bookings: Arc<dyn BookingStore>,
    locks: ShowLockRegistry,
    clock: Arc<dyn Clock>,
    batch_limit: i64,
}

impl ExpiryReaper {
    /// Creates a reaper sharing the engine's lock registry.
    #[must_use]
    pub fn new(
        seats: Arc<dyn SeatStore>,
        bookings: Arc<dyn BookingStore>,
        locks: ShowLockRegistry,
        clock: Arc<dyn Clock>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            seats,
            bookings,
            locks,
            clock,
            batch_limit: config.reaper_batch_limit,
        }
    }

    /// Runs both passes once. Public so tests (and an on-demand wake) can
    /// drive reclamation deterministically.
    ///
    /// # Errors
    ///
    /// Propagates store failures; a partial pass is safe to re-run.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<ReaperReport, BookingError> {
        let mut report = ReaperReport::default();
        self.release_stale_locks(&mut report).await?;
        self.expire_pending_bookings(&mut report).await?;
        if report != ReaperReport::default() {
            info!(
                seats_released = report.seats_released,
                bookings_expired = report.bookings_expired,
                "reaper pass complete"
            );
        }
        Ok(report)
    }

    /// Pass A: release seats whose soft lock lapsed, batched per show to
    /// amortize mutex acquisition. Shows are visited in ascending ID
    /// order.
    async fn release_stale_locks(&self, report: &mut ReaperReport) -> Result<(), BookingError> {
        let now = self.clock.now();
        let stale = self.seats.expired_locks(now, self.batch_limit).await?;

        let mut by_show: BTreeMap<Uuid, Vec<SeatRow>> = BTreeMap::new();
        for row in stale {
            by_show.entry(row.show_id).or_default().push(row);
        }

        for (show_id, rows) in by_show {
            let _guard = self.locks.acquire(show_id).await;
            for row in rows {
                // Re-checked under the show mutex: a fresh re-lock since
                // the select makes the guard fail and the seat is skipped.
                let update = self
                    .seats
                    .conditional_update(row.id, SeatGuard::Lockable { now }, SeatState::Available, now)
                    .await?;
                if update.applied {
                    report.seats_released += 1;
                }
            }
        }
        Ok(())
    }

    /// Pass B: move lapsed PENDING bookings to EXPIRED and release any
    /// seats they still hold. Idempotent with pass A.
    async fn expire_pending_bookings(&self, report: &mut ReaperReport) -> Result<(), BookingError> {
        let now = self.clock.now();
        let lapsed = self.bookings.expired_pending(now, self.batch_limit).await?;

        for candidate in lapsed {
            let _guard = self.locks.acquire(candidate.show_id).await;
            let Some(booking) = self.bookings.booking(candidate.id).await? else {
                continue;
            };
            if booking.status != BookingStatus::Pending || !booking.is_expired(now) {
                continue;
            }
            let applied = self
                .bookings
                .transition(
                    booking.id,
                    BookingStatus::Pending,
                    BookingStatus::Expired,
                    None,
                    None,
                    now,
                )
                .await?;
            if !applied {
                continue;
            }
            report.bookings_expired += 1;
            for seat_id in &booking.seat_ids {
                self.seats
                    .conditional_update(
                        *seat_id,
                        SeatGuard::LockedBy(booking.id),
                        SeatState::Available,
                        now,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Spawns the periodic task. The returned handle wakes it on demand
    /// and shuts it down cleanly; an in-flight pass completes before the
    /// task exits.
    #[must_use]
    pub fn spawn(self, period: Duration) -> ReaperHandle {
        let wake = Arc::new(Notify::new());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task_wake = Arc::clone(&wake);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = task_wake.notified() => {}
                    _ = shutdown_rx.changed() => {}
                }
                if *shutdown_rx.borrow() {
                    break;
                }
                if let Err(error) = self.run_once().await {
                    warn!(%error, "reaper pass failed");
                }
            }
        });

        ReaperHandle {
            wake,
            shutdown: shutdown_tx,
            join,
        }
    }
}

/// Controls a spawned [`ExpiryReaper`].
pub struct ReaperHandle {
    wake: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReaperHandle {
    /// Requests an immediate pass outside the regular schedule.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Signals the task to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use marquee_core::booking::BookingStatus;
    use marquee_core::config::BookingConfig;
    use marquee_core::error::BookingError;
    use marquee_core::seat::SeatState;
    use marquee_core::show::{ShowInfo, ShowStatus};
    use marquee_test_support::{InMemoryBookingStore, InMemorySeatStore, ManualClock, StaticShowCatalog};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{ExpiryReaper, ReaperReport};
    use crate::engine::{ReservationEngine, SeatSelection};
    use crate::lock_registry::ShowLockRegistry;

    struct Rig {
        engine: Arc<ReservationEngine>,
        reaper: ExpiryReaper,
        seats: Arc<InMemorySeatStore>,
        bookings: Arc<InMemoryBookingStore>,
        clock: ManualClock,
        show_id: Uuid,
        seat_id: Uuid,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()
    }

    fn rig() -> Rig {
        let seats = Arc::new(InMemorySeatStore::new());
        let bookings = Arc::new(InMemoryBookingStore::new());
        let catalog = Arc::new(StaticShowCatalog::new());
        let clock = ManualClock::new(t0());
        let locks = ShowLockRegistry::new();
        let config = BookingConfig::default();
        let show_id = Uuid::new_v4();
        let seat_id = Uuid::new_v4();

        catalog.seed(ShowInfo {
            id: show_id,
            movie_id: Uuid::new_v4(),
            screen_id: Uuid::new_v4(),
            starts_at: t0() + chrono::Duration::hours(3),
            ends_at: t0() + chrono::Duration::hours(5),
            base_price: Decimal::from(100),
            status: ShowStatus::Scheduled,
        });
        seats.seed(marquee_core::seat::SeatRow {
            id: seat_id,
            show_id,
            price: Decimal::from(100),
            state: SeatState::Available,
            updated_at: t0(),
        });

        let engine = Arc::new(ReservationEngine::new(
            seats.clone(),
            bookings.clone(),
            catalog,
            locks.clone(),
            Arc::new(clock.clone()),
            config.clone(),
        ));
        let reaper = ExpiryReaper::new(
            seats.clone(),
            bookings.clone(),
            locks,
            Arc::new(clock.clone()),
            &config,
        );
        Rig {
            engine,
            reaper,
            seats,
            bookings,
            clock,
            show_id,
            seat_id,
        }
    }

    async fn initiate_short_hold(rig: &Rig) -> Uuid {
        rig.engine
            .initiate_booking(
                SeatSelection {
                    user_id: Uuid::new_v4(),
                    show_id: rig.show_id,
                    seat_ids: vec![rig.seat_id],
                    lock_duration: Some(chrono::Duration::minutes(1)),
                },
                None,
            )
            .await
            .unwrap()
            .booking_id
    }

    #[tokio::test]
    async fn test_run_once_reclaims_lapsed_hold_and_expires_booking() {
        // Arrange — hold for 1 minute, advance 70 seconds.
        let rig = rig();
        let booking_id = initiate_short_hold(&rig).await;
        rig.clock.advance(chrono::Duration::seconds(70));

        // Act
        let report = rig.reaper.run_once().await.unwrap();

        // Assert
        assert_eq!(report.seats_released, 1);
        assert_eq!(report.bookings_expired, 1);
        assert_eq!(
            rig.seats.row(rig.seat_id).unwrap().state,
            SeatState::Available
        );
        let booking = rig.bookings.row(booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Expired);

        // A late confirm now reports the expiry.
        let confirm = rig.engine.confirm_booking(booking_id, "tx", None).await;
        assert!(matches!(confirm.unwrap_err(), BookingError::Expired(_)));
    }

    #[tokio::test]
    async fn test_run_once_is_idempotent() {
        let rig = rig();
        initiate_short_hold(&rig).await;
        rig.clock.advance(chrono::Duration::seconds(70));

        let first = rig.reaper.run_once().await.unwrap();
        let seat_after_first = rig.seats.row(rig.seat_id).unwrap();

        let second = rig.reaper.run_once().await.unwrap();

        assert_eq!(
            first,
            ReaperReport {
                seats_released: 1,
                bookings_expired: 1,
            }
        );
        assert_eq!(second, ReaperReport::default());
        assert_eq!(rig.seats.row(rig.seat_id).unwrap(), seat_after_first);
    }

    #[tokio::test]
    async fn test_fresh_holds_are_left_alone() {
        let rig = rig();
        let booking_id = initiate_short_hold(&rig).await;
        rig.clock.advance(chrono::Duration::seconds(30));

        let report = rig.reaper.run_once().await.unwrap();

        assert_eq!(report, ReaperReport::default());
        assert_eq!(
            rig.seats.row(rig.seat_id).unwrap().state.holder(),
            Some(booking_id)
        );
        assert_eq!(
            rig.bookings.row(booking_id).unwrap().status,
            BookingStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_expired_booking_with_already_released_seats() {
        // Pass A released the seat in an earlier run; pass B must still
        // expire the booking without erroring on the free seat.
        let rig = rig();
        let booking_id = initiate_short_hold(&rig).await;
        rig.clock.advance(chrono::Duration::seconds(70));

        // Simulate an earlier pass A by releasing the seat directly.
        rig.seats.seed(marquee_core::seat::SeatRow {
            id: rig.seat_id,
            show_id: rig.show_id,
            price: Decimal::from(100),
            state: SeatState::Available,
            updated_at: t0(),
        });

        let report = rig.reaper.run_once().await.unwrap();

        assert_eq!(report.seats_released, 0);
        assert_eq!(report.bookings_expired, 1);
        assert_eq!(
            rig.bookings.row(booking_id).unwrap().status,
            BookingStatus::Expired
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reaper_wakes_on_demand_and_shuts_down() {
        let rig = rig();
        let booking_id = initiate_short_hold(&rig).await;
        rig.clock.advance(chrono::Duration::seconds(70));

        let handle = rig.reaper.spawn(Duration::from_secs(300));

        handle.wake();
        // Paused-time sleep yields until the reaper task goes idle.
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            rig.bookings.row(booking_id).unwrap().status,
            BookingStatus::Expired
        );
        assert_eq!(
            rig.seats.row(rig.seat_id).unwrap().state,
            SeatState::Available
        );

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reaper_runs_on_its_interval() {
        let rig = rig();
        let booking_id = initiate_short_hold(&rig).await;
        rig.clock.advance(chrono::Duration::seconds(70));

        let handle = rig.reaper.spawn(Duration::from_secs(300));
        tokio::time::sleep(Duration::from_secs(301)).await;

        assert_eq!(
            rig.bookings.row(booking_id).unwrap().status,
            BookingStatus::Expired
        );

        handle.shutdown().await;
    }
}
