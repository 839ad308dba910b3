//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use marquee_booking::coordinator::PaymentCoordinator;
use marquee_booking::engine::ReservationEngine;
use marquee_core::clock::Clock;
use marquee_core::store::{BookingStore, SeatStore};
use tokio::time::Instant;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The reservation engine.
    pub engine: Arc<ReservationEngine>,
    /// The payment coordinator.
    pub coordinator: Arc<PaymentCoordinator>,
    /// Seat store for read-only projections.
    pub seats: Arc<dyn SeatStore>,
    /// Booking store for read-only projections.
    pub bookings: Arc<dyn BookingStore>,
    /// Clock shared with the engine.
    pub clock: Arc<dyn Clock>,
    /// Per-request engine deadline; `None` disables it.
    pub request_deadline: Option<Duration>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        engine: Arc<ReservationEngine>,
        coordinator: Arc<PaymentCoordinator>,
        seats: Arc<dyn SeatStore>,
        bookings: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        request_deadline: Option<Duration>,
    ) -> Self {
        Self {
            engine,
            coordinator,
            seats,
            bookings,
            clock,
            request_deadline,
        }
    }

    /// The deadline for an engine call starting now.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.request_deadline.map(|d| Instant::now() + d)
    }
}
