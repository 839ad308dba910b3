//! Reservation engine configuration.

use std::time::Duration;

/// Tunables for the engine, the reaper, and the payment coordinator.
///
/// Domain durations (seat holds, cancellation grace) use
/// `chrono::Duration` because they are compared against store
/// timestamps; scheduling durations (reaper period, retry backoff) use
/// `std::time::Duration` because they feed the tokio timer.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// How long a seat soft lock is held for a pending booking.
    pub lock_duration: chrono::Duration,
    /// How often the expiry reaper runs.
    pub cleanup_interval: Duration,
    /// Maximum gateway retries on transient failure.
    pub max_payment_retries: u32,
    /// Initial backoff between gateway retries; doubles each attempt.
    pub payment_retry_backoff: Duration,
    /// Minimum lead time before show start for cancelling a confirmed
    /// booking.
    pub cancel_grace: chrono::Duration,
    /// Maximum rows a single reaper pass claims per query.
    pub reaper_batch_limit: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lock_duration: chrono::Duration::minutes(15),
            cleanup_interval: Duration::from_secs(5 * 60),
            max_payment_retries: 3,
            payment_retry_backoff: Duration::from_secs(2),
            cancel_grace: chrono::Duration::minutes(60),
            reaper_batch_limit: 500,
        }
    }
}
