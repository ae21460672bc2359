//! Kraken API Data Models
//!
//! Response types for the Kraken REST API. Every endpoint wraps its
//! payload in the same `{error: [..], result: {..}}` envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kraken response envelope.
///
/// `error` is empty on success; `result` may be absent when the call
/// failed.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenResponse<T> {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

impl<T> KrakenResponse<T> {
    /// True when Kraken reported no errors
    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }

    /// Kraken error messages joined for display
    pub fn error_message(&self) -> String {
        self.error.join(", ")
    }
}

/// Result of `GET /0/public/Time`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerTime {
    /// Unix timestamp (seconds)
    pub unixtime: i64,
    #[serde(default)]
    pub rfc1123: String,
}

/// Human-readable order description returned by `AddOrder`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDescription {
    /// e.g. "buy 1.25000000 XBTUSD @ limit 37500.0"
    pub order: String,
    #[serde(default)]
    pub close: Option<String>,
}

/// Result of `POST /0/private/AddOrder`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOrderResult {
    #[serde(default)]
    pub descr: Option<OrderDescription>,
    /// Transaction ids of the placed order(s); empty for validate-only calls
    #[serde(default)]
    pub txid: Vec<String>,
}

/// Result of `POST /0/private/Balance`: asset name → amount as a decimal
/// string
pub type BalanceResult = HashMap<String, String>;

/// Result of `POST /0/private/OpenOrders`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrdersResult {
    /// Order id → raw order data
    #[serde(default)]
    pub open: HashMap<String, serde_json::Value>,
}
