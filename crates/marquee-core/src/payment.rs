//! Payment gateway contract.
//!
//! The gateway is an opaque external service; calls may take tens of
//! seconds. The engine never calls it while holding a show mutex — the
//! payment coordinator owns all gateway interaction and retries.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Final word from the gateway on a charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The charge went through.
    Approved {
        /// Gateway transaction reference.
        transaction_id: String,
    },
    /// The gateway rejected the charge. Not retriable.
    Declined {
        /// Gateway-supplied reason.
        reason: String,
    },
}

/// Transport-level gateway failures. Retriable with backoff.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway did not answer in time.
    #[error("payment gateway timed out")]
    Timeout,

    /// The request never reached the gateway.
    #[error("payment gateway transport error: {0}")]
    Transport(String),
}

/// Asynchronous payment gateway. The booking ID doubles as the
/// idempotency key for both charges and refunds.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submits a charge for the booking.
    async fn charge(
        &self,
        booking_id: Uuid,
        amount: Decimal,
    ) -> Result<ChargeOutcome, GatewayError>;

    /// Refunds a previously approved charge.
    async fn refund(
        &self,
        booking_id: Uuid,
        transaction_id: &str,
        amount: Decimal,
    ) -> Result<(), GatewayError>;
}
