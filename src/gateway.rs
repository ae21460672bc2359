//! Trade Gateway Seam
//!
//! The webhook endpoint talks to the exchange through the [`TradeGateway`]
//! trait so the live Kraken client can be swapped for a stub in tests.
//! Gateway failures are encoded in [`TradeOutcome`], never retried here:
//! the sender is expected to resend if appropriate.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::order::OrderCommand;

/// Result of a gateway call: either a submitted (or validated) order, or a
/// failure with a human-readable reason and optional structured detail.
#[derive(Debug, Clone, Serialize)]
pub struct TradeOutcome {
    pub success: bool,
    /// Exchange order id, present on successful live submission
    pub order_id: Option<String>,
    /// Failure reason, present on failure
    pub error: Option<String>,
    /// Raw gateway payload or structured failure detail (e.g. a
    /// `retry_after` hint in seconds)
    pub details: Option<Value>,
}

impl TradeOutcome {
    pub fn success(order_id: Option<String>, details: Option<Value>) -> Self {
        Self {
            success: true,
            order_id,
            error: None,
            details,
        }
    }

    pub fn failure(error: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            order_id: None,
            error: Some(error.into()),
            details,
        }
    }
}

/// Exchange-facing order submission interface.
///
/// Both calls run synchronously from the caller's point of view: once an
/// order is dispatched the call runs to completion or failure before the
/// endpoint responds.
#[async_trait]
pub trait TradeGateway: Send + Sync {
    /// Submit a live order
    async fn execute(&self, command: OrderCommand) -> TradeOutcome;

    /// Validate an order with the exchange without submitting it
    async fn dry_run(&self, command: OrderCommand) -> TradeOutcome;
}
