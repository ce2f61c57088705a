//! Order confirmation seam.
//!
//! Checkout hands the cart snapshot to an [`OrderGateway`] and waits for it.
//! The store has no payment integration of its own; [`SimulatedGateway`]
//! stands in for one by sleeping and then accepting every order.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::model::PendingOrder;

/// Errors from confirming an order.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused the order.
    #[error("declined: {0}")]
    Declined(String),

    /// The gateway could not be reached or failed internally.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// No answer within the checkout timeout.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Confirms (and, in a real deployment, pays for) an order.
pub trait OrderGateway: Send + Sync {
    /// Confirm `order`. The cart is only cleared if this succeeds.
    fn confirm(&self, order: &PendingOrder) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Gateway that accepts every order after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    delay: Duration,
}

impl SimulatedGateway {
    /// Create a gateway that answers after `delay`.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

impl OrderGateway for SimulatedGateway {
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    async fn confirm(&self, order: &PendingOrder) -> Result<(), GatewayError> {
        debug!(delay_ms = self.delay.as_millis(), total = %order.total, "Simulating order confirmation");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
