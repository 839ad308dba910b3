//! Payment coordinator — drives a booking through the gateway.
//!
//! The coordinator owns every gateway interaction and all retry logic.
//! It invokes the engine's confirm or cancel on the outcome; the engine
//! never waits on the gateway while holding a show mutex.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use marquee_core::booking::{BookingStatus, PaymentStatus};
use marquee_core::clock::Clock;
use marquee_core::error::BookingError;
use marquee_core::payment::{ChargeOutcome, GatewayError, PaymentGateway};
use marquee_core::store::BookingStore;

use crate::engine::ReservationEngine;
use crate::retry::RetryPolicy;

/// Final word on a payment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    /// Charge approved and booking confirmed.
    Completed {
        /// The gateway transaction reference.
        payment_ref: String,
    },
    /// Charge declined (or retries exhausted); booking cancelled and
    /// seats released.
    Declined {
        /// Why the charge did not go through.
        reason: String,
    },
}

/// Orchestrates charge, confirm/cancel, and compensating refunds.
pub struct PaymentCoordinator {
    engine: Arc<ReservationEngine>,
    bookings: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl PaymentCoordinator {
    /// Creates a coordinator over the engine and gateway.
    #[must_use]
    pub fn new(
        engine: Arc<ReservationEngine>,
        bookings: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            bookings,
            gateway,
            clock,
            retry,
        }
    }

    /// Charges the booking's total and drives it to CONFIRMED or
    /// CANCELLED.
    ///
    /// While retries are in flight the booking stays PENDING; if its
    /// hold lapses meanwhile the reaper takes it and an approval that
    /// arrives too late is compensated with a refund.
    ///
    /// # Errors
    ///
    /// `Expired` when the approval came after the hold lapsed (the
    /// charge has been refunded), plus the usual not-found/terminal
    /// cases. A declined charge is a normal outcome, not an error.
    #[instrument(skip(self), fields(%booking_id))]
    pub async fn process_payment(&self, booking_id: Uuid) -> Result<PaymentResult, BookingError> {
        let booking = self
            .bookings
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        match booking.status {
            BookingStatus::Pending => {}
            BookingStatus::Confirmed => return Err(BookingError::AlreadyConfirmed(booking_id)),
            status => return Err(BookingError::Terminal { booking_id, status }),
        }

        self.bookings
            .update_payment(booking_id, PaymentStatus::Processing, None, self.clock.now())
            .await?;

        match self.charge_with_retries(booking_id, booking.total_amount).await {
            Ok(ChargeOutcome::Approved { transaction_id }) => {
                match self
                    .engine
                    .confirm_booking(booking_id, &transaction_id, None)
                    .await
                {
                    Ok(()) => {
                        info!(%booking_id, transaction_id, "payment completed");
                        Ok(PaymentResult::Completed {
                            payment_ref: transaction_id,
                        })
                    }
                    Err(BookingError::Expired(_)) => {
                        // The hold lapsed while the gateway deliberated;
                        // seats are gone, so give the money back.
                        if let Err(gateway_error) = self
                            .gateway
                            .refund(booking_id, &transaction_id, booking.total_amount)
                            .await
                        {
                            error!(%booking_id, %gateway_error, "compensating refund failed");
                        }
                        self.bookings
                            .update_payment(
                                booking_id,
                                PaymentStatus::Refunded,
                                Some(transaction_id),
                                self.clock.now(),
                            )
                            .await?;
                        Err(BookingError::Expired(booking_id))
                    }
                    Err(other) => Err(other),
                }
            }
            Ok(ChargeOutcome::Declined { reason }) => {
                info!(%booking_id, reason, "charge declined");
                self.fail_and_release(booking_id, booking.user_id).await?;
                Ok(PaymentResult::Declined { reason })
            }
            Err(gateway_error) => {
                warn!(%booking_id, %gateway_error, "gateway unreachable, retries exhausted");
                self.fail_and_release(booking_id, booking.user_id).await?;
                Ok(PaymentResult::Declined {
                    reason: gateway_error.to_string(),
                })
            }
        }
    }

    /// Pushes a refund for an already-cancelled confirmed booking
    /// through the gateway, with the same backoff schedule as charges.
    ///
    /// # Errors
    ///
    /// Wraps a persistent gateway failure as a store error for the
    /// caller to surface.
    #[instrument(skip(self, payment_ref), fields(%booking_id))]
    pub async fn issue_refund(
        &self,
        booking_id: Uuid,
        payment_ref: &str,
        amount: Decimal,
    ) -> Result<(), BookingError> {
        let mut attempt = 0;
        loop {
            match self.gateway.refund(booking_id, payment_ref, amount).await {
                Ok(()) => {
                    info!(%booking_id, %amount, "refund issued");
                    return Ok(());
                }
                Err(gateway_error) if attempt < self.retry.max_retries => {
                    warn!(%booking_id, %gateway_error, attempt, "refund attempt failed, backing off");
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(gateway_error) => {
                    return Err(BookingError::Store(format!(
                        "refund for booking {booking_id} failed: {gateway_error}"
                    )));
                }
            }
        }
    }

    async fn charge_with_retries(
        &self,
        booking_id: Uuid,
        amount: Decimal,
    ) -> Result<ChargeOutcome, GatewayError> {
        let mut attempt = 0;
        loop {
            match self.gateway.charge(booking_id, amount).await {
                Ok(outcome) => return Ok(outcome),
                Err(gateway_error) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(%booking_id, %gateway_error, attempt, ?delay, "transient gateway failure, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(gateway_error) => return Err(gateway_error),
            }
        }
    }

    /// Marks the payment failed and releases the seats as the booking
    /// owner. The reaper may have reclaimed the booking while the
    /// gateway stalled; that is not an error.
    async fn fail_and_release(&self, booking_id: Uuid, user_id: Uuid) -> Result<(), BookingError> {
        self.bookings
            .update_payment(booking_id, PaymentStatus::Failed, None, self.clock.now())
            .await?;
        match self.engine.cancel_booking(booking_id, user_id, None).await {
            Ok(_) | Err(BookingError::NotCancellable { .. }) => Ok(()),
            Err(other) => Err(other),
        }
    }
}
