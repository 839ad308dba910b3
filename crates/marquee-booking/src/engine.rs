//! Reservation engine — the lock/confirm/release state machine.
//!
//! All three operations run their mutations under the owning show's
//! mutex and express every seat transition as a store conditional
//! update, so a race lost to another process rolls back instead of
//! double-booking.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use marquee_core::booking::{BookingRow, BookingStatus, PaymentStatus};
use marquee_core::clock::Clock;
use marquee_core::config::BookingConfig;
use marquee_core::error::BookingError;
use marquee_core::seat::{SeatGuard, SeatState};
use marquee_core::show::ShowCatalog;
use marquee_core::store::{BookingStore, SeatStore};

use crate::lock_registry::ShowLockRegistry;

/// A request to reserve specific seats of a show.
#[derive(Debug, Clone)]
pub struct SeatSelection {
    /// The requesting user.
    pub user_id: Uuid,
    /// The show to book.
    pub show_id: Uuid,
    /// The seats to hold, in request order.
    pub seat_ids: Vec<Uuid>,
    /// Overrides the configured soft-lock duration when set.
    pub lock_duration: Option<chrono::Duration>,
}

/// Handle returned by a successful `initiate_booking`.
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    /// The new PENDING booking.
    pub booking_id: Uuid,
    /// When the seat holds lapse without confirmation.
    pub expires_at: DateTime<Utc>,
    /// Sum of the seat prices.
    pub total_amount: Decimal,
}

/// What `cancel_booking` did, and what remains for the caller.
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    /// A pending booking's seat holds were released.
    Released,
    /// A confirmed booking was cancelled; the caller must drive the
    /// refund through the payment coordinator.
    RefundDue {
        /// The gateway reference of the original charge, if recorded.
        payment_ref: Option<String>,
        /// The amount to give back.
        amount: Decimal,
    },
}

/// The reservation engine. Sole writer of seat and booking states.
pub struct ReservationEngine {
    seats: Arc<dyn SeatStore>,
    bookings: Arc<dyn BookingStore>,
    catalog: Arc<dyn ShowCatalog>,
    locks: ShowLockRegistry,
    clock: Arc<dyn Clock>,
    config: BookingConfig,
}

impl ReservationEngine {
    /// Creates an engine over the given collaborators.
    #[must_use]
    pub fn new(
        seats: Arc<dyn SeatStore>,
        bookings: Arc<dyn BookingStore>,
        catalog: Arc<dyn ShowCatalog>,
        locks: ShowLockRegistry,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
    ) -> Self {
        Self {
            seats,
            bookings,
            catalog,
            locks,
            clock,
            config,
        }
    }

    /// Soft-locks the selected seats and creates a PENDING booking.
    ///
    /// All-or-nothing: when any seat is booked or freshly locked the
    /// whole request fails with the offending seat IDs, and when a
    /// conditional update loses a cross-process race every prior seat
    /// update and the booking row are rolled back.
    ///
    /// # Errors
    ///
    /// `SeatsUnavailable` with the offending IDs, `Conflict` on a lost
    /// race, `Timeout` when `deadline` elapses (no partial effects
    /// remain), plus the usual not-found and validation cases.
    #[instrument(
        skip(self, selection),
        fields(
            user_id = %selection.user_id,
            show_id = %selection.show_id,
            seats = selection.seat_ids.len(),
        )
    )]
    pub async fn initiate_booking(
        &self,
        selection: SeatSelection,
        deadline: Option<Instant>,
    ) -> Result<BookingReceipt, BookingError> {
        validate_seat_ids(&selection.seat_ids)?;
        Self::ensure_deadline(deadline)?;

        let show = self
            .catalog
            .show(selection.show_id)
            .await?
            .ok_or(BookingError::ShowNotFound(selection.show_id))?;

        let _guard = self.lock_show(selection.show_id, deadline).await?;
        let now = self.clock.now();
        if !show.is_bookable(now) {
            return Err(BookingError::Validation(
                "show is not open for booking".to_owned(),
            ));
        }

        Self::ensure_deadline(deadline)?;
        let rows = self.seats.seats(selection.show_id, &selection.seat_ids).await?;
        if rows.len() != selection.seat_ids.len() {
            let found: HashSet<Uuid> = rows.iter().map(|row| row.id).collect();
            let missing = selection
                .seat_ids
                .iter()
                .copied()
                .filter(|id| !found.contains(id))
                .collect();
            return Err(BookingError::SeatsNotFound {
                show_id: selection.show_id,
                seat_ids: missing,
            });
        }

        // A lock whose hold has lapsed counts as available here; the
        // conditional update below re-checks the same predicate.
        let failed_seat_ids: Vec<Uuid> = rows
            .iter()
            .filter(|row| !row.state.is_effectively_available(now))
            .map(|row| row.id)
            .collect();
        if !failed_seat_ids.is_empty() {
            return Err(BookingError::SeatsUnavailable { failed_seat_ids });
        }

        let total_amount: Decimal = rows.iter().map(|row| row.price).sum();
        let lock_duration = selection.lock_duration.unwrap_or(self.config.lock_duration);
        let booking = BookingRow::pending(
            selection.user_id,
            selection.show_id,
            selection.seat_ids.clone(),
            total_amount,
            now,
            lock_duration,
        );
        let booking_id = booking.id;
        let expires_at = booking.expires_at;

        Self::ensure_deadline(deadline)?;
        self.bookings.insert(booking).await?;

        let mut locked: Vec<Uuid> = Vec::with_capacity(selection.seat_ids.len());
        for seat_id in &selection.seat_ids {
            if Self::ensure_deadline(deadline).is_err() {
                self.roll_back_initiate(booking_id, &locked, now).await;
                return Err(BookingError::Timeout);
            }
            let update = match self
                .seats
                .conditional_update(
                    *seat_id,
                    SeatGuard::Lockable { now },
                    SeatState::Locked {
                        holder: booking_id,
                        until: expires_at,
                    },
                    now,
                )
                .await
            {
                Ok(update) => update,
                Err(error) => {
                    self.roll_back_initiate(booking_id, &locked, now).await;
                    return Err(error);
                }
            };
            if !update.applied {
                self.roll_back_initiate(booking_id, &locked, now).await;
                return Err(BookingError::Conflict);
            }
            locked.push(*seat_id);
        }

        info!(%booking_id, %expires_at, %total_amount, "booking initiated");
        Ok(BookingReceipt {
            booking_id,
            expires_at,
            total_amount,
        })
    }

    /// Promotes a PENDING booking's seat holds to hard bookings and marks
    /// the payment completed.
    ///
    /// # Errors
    ///
    /// `Expired` when the hold lapsed (the reaper owns the expiry
    /// transition; the booking row is left untouched here),
    /// `AlreadyConfirmed`/`Terminal` for repeat calls, and
    /// `InvariantViolated` when a seat is not held by this booking.
    #[instrument(skip(self, payment_ref), fields(%booking_id))]
    pub async fn confirm_booking(
        &self,
        booking_id: Uuid,
        payment_ref: &str,
        deadline: Option<Instant>,
    ) -> Result<(), BookingError> {
        Self::ensure_deadline(deadline)?;
        let peek = self
            .bookings
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        let _guard = self.lock_show(peek.show_id, deadline).await?;
        Self::ensure_deadline(deadline)?;
        let booking = self
            .bookings
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        match booking.status {
            BookingStatus::Pending => {}
            BookingStatus::Confirmed => return Err(BookingError::AlreadyConfirmed(booking_id)),
            BookingStatus::Expired => return Err(BookingError::Expired(booking_id)),
            status @ BookingStatus::Cancelled => {
                return Err(BookingError::Terminal { booking_id, status });
            }
        }

        let now = self.clock.now();
        if booking.is_expired(now) {
            return Err(BookingError::Expired(booking_id));
        }

        // Past this point the transition runs to completion; a deadline
        // abort mid-way would leave seats half-booked.
        for seat_id in &booking.seat_ids {
            let update = self
                .seats
                .conditional_update(
                    *seat_id,
                    SeatGuard::LockedBy(booking_id),
                    SeatState::Booked { holder: booking_id },
                    now,
                )
                .await?;
            if !update.applied {
                error!(
                    %booking_id,
                    %seat_id,
                    current = ?update.current,
                    "seat not locked by booking during confirm"
                );
                return Err(BookingError::InvariantViolated(format!(
                    "seat {seat_id} is not locked by booking {booking_id}"
                )));
            }
        }

        let applied = self
            .bookings
            .transition(
                booking_id,
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                Some(PaymentStatus::Completed),
                Some(payment_ref.to_owned()),
                now,
            )
            .await?;
        if !applied {
            error!(%booking_id, "booking left PENDING while its show mutex was held");
            return Err(BookingError::InvariantViolated(format!(
                "booking {booking_id} changed state during confirm"
            )));
        }

        info!(%booking_id, payment_ref, "booking confirmed");
        Ok(())
    }

    /// Cancels a booking on behalf of its owner.
    ///
    /// A PENDING booking releases its seat holds. A CONFIRMED booking is
    /// cancellable only while the show starts later than the configured
    /// grace window; its seats return to AVAILABLE, the payment is marked
    /// refunded, and the caller receives a `RefundDue` to hand to the
    /// payment coordinator.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when `user_id` does not own the booking,
    /// `NotCancellable` past the grace window or in a terminal state.
    #[instrument(skip(self), fields(%booking_id, %user_id))]
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        deadline: Option<Instant>,
    ) -> Result<CancelOutcome, BookingError> {
        Self::ensure_deadline(deadline)?;
        let peek = self
            .bookings
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        if peek.user_id != user_id {
            return Err(BookingError::Unauthorized {
                booking_id,
                user_id,
            });
        }

        let _guard = self.lock_show(peek.show_id, deadline).await?;
        Self::ensure_deadline(deadline)?;
        let booking = self
            .bookings
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        let now = self.clock.now();

        match booking.status {
            BookingStatus::Pending => {
                for seat_id in &booking.seat_ids {
                    // The hold may already have lapsed and been reaped;
                    // a failed guard here is not an error.
                    let update = self
                        .seats
                        .conditional_update(
                            *seat_id,
                            SeatGuard::LockedBy(booking_id),
                            SeatState::Available,
                            now,
                        )
                        .await?;
                    if !update.applied {
                        warn!(%booking_id, %seat_id, "seat hold already released before cancel");
                    }
                }
                self.bookings
                    .transition(
                        booking_id,
                        BookingStatus::Pending,
                        BookingStatus::Cancelled,
                        None,
                        None,
                        now,
                    )
                    .await?;
                info!(%booking_id, "pending booking cancelled");
                Ok(CancelOutcome::Released)
            }
            BookingStatus::Confirmed => {
                let show = self
                    .catalog
                    .show(booking.show_id)
                    .await?
                    .ok_or(BookingError::ShowNotFound(booking.show_id))?;
                if show.starts_at <= now + self.config.cancel_grace {
                    return Err(BookingError::NotCancellable {
                        booking_id,
                        reason: "show starts within the cancellation grace window".to_owned(),
                    });
                }
                for seat_id in &booking.seat_ids {
                    let update = self
                        .seats
                        .conditional_update(
                            *seat_id,
                            SeatGuard::BookedBy(booking_id),
                            SeatState::Available,
                            now,
                        )
                        .await?;
                    if !update.applied {
                        error!(
                            %booking_id,
                            %seat_id,
                            current = ?update.current,
                            "seat not booked by confirmed booking during cancel"
                        );
                        return Err(BookingError::InvariantViolated(format!(
                            "seat {seat_id} is not booked by booking {booking_id}"
                        )));
                    }
                }
                self.bookings
                    .transition(
                        booking_id,
                        BookingStatus::Confirmed,
                        BookingStatus::Cancelled,
                        Some(PaymentStatus::Refunded),
                        None,
                        now,
                    )
                    .await?;
                info!(%booking_id, "confirmed booking cancelled, refund due");
                Ok(CancelOutcome::RefundDue {
                    payment_ref: booking.payment_ref.clone(),
                    amount: booking.total_amount,
                })
            }
            status => Err(BookingError::NotCancellable {
                booking_id,
                reason: format!("booking is already {status:?}"),
            }),
        }
    }

    async fn lock_show(
        &self,
        show_id: Uuid,
        deadline: Option<Instant>,
    ) -> Result<OwnedMutexGuard<()>, BookingError> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.locks.acquire(show_id))
                .await
                .map_err(|_| BookingError::Timeout),
            None => Ok(self.locks.acquire(show_id).await),
        }
    }

    fn ensure_deadline(deadline: Option<Instant>) -> Result<(), BookingError> {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(BookingError::Timeout);
        }
        Ok(())
    }

    /// Best-effort reversal of a partially applied initiate: every seat
    /// locked so far returns to AVAILABLE and the booking row is
    /// cancelled. Guard predicates keep this safe against concurrent
    /// reaper activity, and anything left behind is reapable.
    async fn roll_back_initiate(&self, booking_id: Uuid, locked: &[Uuid], now: DateTime<Utc>) {
        for seat_id in locked {
            if let Err(error) = self
                .seats
                .conditional_update(
                    *seat_id,
                    SeatGuard::LockedBy(booking_id),
                    SeatState::Available,
                    now,
                )
                .await
            {
                warn!(%booking_id, %seat_id, %error, "failed to release seat during rollback");
            }
        }
        if let Err(error) = self
            .bookings
            .transition(
                booking_id,
                BookingStatus::Pending,
                BookingStatus::Cancelled,
                None,
                None,
                now,
            )
            .await
        {
            warn!(%booking_id, %error, "failed to cancel booking during rollback");
        }
    }
}

fn validate_seat_ids(seat_ids: &[Uuid]) -> Result<(), BookingError> {
    if seat_ids.is_empty() {
        return Err(BookingError::Validation("no seats requested".to_owned()));
    }
    let mut seen = HashSet::with_capacity(seat_ids.len());
    if !seat_ids.iter().all(|id| seen.insert(*id)) {
        return Err(BookingError::Validation(
            "duplicate seat ids in request".to_owned(),
        ));
    }
    Ok(())
}
