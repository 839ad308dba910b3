//! Scripted payment gateway for coordinator tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use marquee_core::payment::{ChargeOutcome, GatewayError, PaymentGateway};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A gateway that replays a scripted sequence of charge results and
/// records every charge and refund it receives.
///
/// When the script runs dry, charges are approved with a generated
/// transaction ID; refunds always succeed.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<ChargeOutcome, GatewayError>>>,
    charges: Mutex<Vec<(Uuid, Decimal)>>,
    refunds: Mutex<Vec<(Uuid, String, Decimal)>>,
}

impl ScriptedGateway {
    /// Creates a gateway that approves everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway that replays `results` in order before falling
    /// back to approval.
    #[must_use]
    pub fn with_script(results: Vec<Result<ChargeOutcome, GatewayError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            charges: Mutex::new(Vec::new()),
            refunds: Mutex::new(Vec::new()),
        }
    }

    /// Every charge received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn charges(&self) -> Vec<(Uuid, Decimal)> {
        self.charges.lock().unwrap().clone()
    }

    /// Every refund received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn refunds(&self) -> Vec<(Uuid, String, Decimal)> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(
        &self,
        booking_id: Uuid,
        amount: Decimal,
    ) -> Result<ChargeOutcome, GatewayError> {
        self.charges.lock().unwrap().push((booking_id, amount));
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ChargeOutcome::Approved {
                transaction_id: format!("tx_{booking_id}"),
            })
        })
    }

    async fn refund(
        &self,
        booking_id: Uuid,
        transaction_id: &str,
        amount: Decimal,
    ) -> Result<(), GatewayError> {
        self.refunds
            .lock()
            .unwrap()
            .push((booking_id, transaction_id.to_owned(), amount));
        Ok(())
    }
}
