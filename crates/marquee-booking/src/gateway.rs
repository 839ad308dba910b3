//! Simulated payment gateway for local runs and demos.
//!
//! Approves a configurable fraction of charges after an artificial
//! processing delay. The success roll goes through the injected RNG so
//! tests can script the outcome.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use marquee_core::payment::{ChargeOutcome, GatewayError, PaymentGateway};
use marquee_core::rng::DeterministicRng;

/// An in-process gateway that needs no network.
pub struct SimulatedGateway {
    success_rate: f64,
    processing_delay: Duration,
    rng: Mutex<Box<dyn DeterministicRng>>,
}

impl SimulatedGateway {
    /// Creates a gateway approving roughly `success_rate` of charges
    /// after `processing_delay`.
    #[must_use]
    pub fn new(
        success_rate: f64,
        processing_delay: Duration,
        rng: Box<dyn DeterministicRng>,
    ) -> Self {
        Self {
            success_rate,
            processing_delay,
            rng: Mutex::new(rng),
        }
    }
}

impl std::fmt::Debug for SimulatedGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedGateway")
            .field("success_rate", &self.success_rate)
            .field("processing_delay", &self.processing_delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(
        &self,
        booking_id: Uuid,
        amount: Decimal,
    ) -> Result<ChargeOutcome, GatewayError> {
        tokio::time::sleep(self.processing_delay).await;
        let roll = self.rng.lock().unwrap().next_f64();
        debug!(%booking_id, %amount, roll, "simulated charge");
        if roll < self.success_rate {
            Ok(ChargeOutcome::Approved {
                transaction_id: format!("sim_{}", Uuid::new_v4().simple()),
            })
        } else {
            Ok(ChargeOutcome::Declined {
                reason: "card declined".to_owned(),
            })
        }
    }

    async fn refund(
        &self,
        booking_id: Uuid,
        transaction_id: &str,
        amount: Decimal,
    ) -> Result<(), GatewayError> {
        tokio::time::sleep(self.processing_delay).await;
        debug!(%booking_id, transaction_id, %amount, "simulated refund");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use marquee_core::payment::{ChargeOutcome, PaymentGateway};
    use marquee_core::rng::DeterministicRng;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::SimulatedGateway;

    /// Replays a fixed sequence of rolls.
    #[derive(Debug)]
    struct SequenceRng {
        rolls: Vec<f64>,
        next: usize,
    }

    impl DeterministicRng for SequenceRng {
        fn next_f64(&mut self) -> f64 {
            let roll = self.rolls[self.next % self.rolls.len()];
            self.next += 1;
            roll
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_roll_below_success_rate_approves() {
        let gateway = SimulatedGateway::new(
            0.9,
            Duration::from_millis(50),
            Box::new(SequenceRng {
                rolls: vec![0.2, 0.95],
                next: 0,
            }),
        );

        let first = gateway
            .charge(Uuid::new_v4(), Decimal::from(100))
            .await
            .unwrap();
        assert!(matches!(first, ChargeOutcome::Approved { .. }));

        let second = gateway
            .charge(Uuid::new_v4(), Decimal::from(100))
            .await
            .unwrap();
        assert!(matches!(second, ChargeOutcome::Declined { .. }));
    }
}
