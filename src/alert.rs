//! TradingView Alert Schema
//!
//! Inbound data contract for webhook alerts. Raw payloads are parsed into
//! [`AlertPayload`] and then validated/normalized into an immutable
//! [`Alert`]. Validation is all-or-nothing: either every rule passes and a
//! fully-typed alert comes out, or a [`ValidationError`] is returned that
//! lists every offending field.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Enums
// ============================================================================

/// Order side: buy or sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Parse a side string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type, mirroring the Kraken order type vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
    StopLossLimit,
    TakeProfitLimit,
}

impl OrderType {
    /// Parse an order type string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "market" => Some(Self::Market),
            "limit" => Some(Self::Limit),
            "stop-loss" => Some(Self::StopLoss),
            "take-profit" => Some(Self::TakeProfit),
            "stop-loss-limit" => Some(Self::StopLossLimit),
            "take-profit-limit" => Some(Self::TakeProfitLimit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::StopLoss => "stop-loss",
            Self::TakeProfit => "take-profit",
            Self::StopLossLimit => "stop-loss-limit",
            Self::TakeProfitLimit => "take-profit-limit",
        }
    }

    /// True for order types that require a limit price
    pub fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLossLimit | Self::TakeProfitLimit)
    }

    /// True for order types that require a stop/trigger price
    pub fn requires_stop_price(&self) -> bool {
        matches!(
            self,
            Self::StopLoss | Self::StopLossLimit | Self::TakeProfit | Self::TakeProfitLimit
        )
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Symbol normalization
// ============================================================================

/// Alias table mapping common TradingView spellings to Kraken pair names
const SYMBOL_ALIASES: &[(&str, &str)] = &[
    ("BTCUSD", "XBTUSD"),
    ("BTC/USD", "XBTUSD"),
    ("ETHUSD", "ETHUSD"),
    ("ETH/USD", "ETHUSD"),
];

/// Normalize a symbol: trim, uppercase, then re-map through the alias table.
///
/// Idempotent: normalizing an already-normalized symbol is a no-op.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_ascii_uppercase();
    for (alias, pair) in SYMBOL_ALIASES {
        if upper == *alias {
            return (*pair).to_string();
        }
    }
    upper
}

// ============================================================================
// Validation errors
// ============================================================================

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Alert validation failure listing every offending field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Field names that failed validation
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|e| e.field).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid alert: ")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Alert payload and validated alert
// ============================================================================

/// Raw alert payload as sent by TradingView, before validation.
///
/// String-typed where leniency matters so that a bad `side` or `order_type`
/// is reported as a field error instead of a parse failure. Unknown fields
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertPayload {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub volume: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub leverage: Option<i64>,
    pub strategy_name: Option<String>,
    pub alert_message: Option<String>,
    #[serde(default)]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

/// A validated, normalized TradingView alert.
///
/// Constructed once per request via [`AlertPayload::validate`], immutable
/// thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Trading pair, uppercased and alias-mapped (e.g. "XBTUSD")
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub volume: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub leverage: Option<i64>,
    pub strategy_name: Option<String>,
    pub alert_message: Option<String>,
    pub custom_fields: HashMap<String, serde_json::Value>,
}

impl AlertPayload {
    /// Validate and normalize the payload into an [`Alert`].
    ///
    /// Checks are independent per field; all failures are collected and
    /// reported together. No partial alert is ever returned.
    pub fn validate(self) -> Result<Alert, ValidationError> {
        let mut errors = Vec::new();

        let symbol = match self.symbol.as_deref() {
            None => {
                errors.push(FieldError {
                    field: "symbol",
                    reason: "is required".to_string(),
                });
                None
            }
            Some(raw) => {
                let normalized = normalize_symbol(raw);
                if normalized.is_empty() {
                    errors.push(FieldError {
                        field: "symbol",
                        reason: "must be non-empty".to_string(),
                    });
                    None
                } else {
                    Some(normalized)
                }
            }
        };

        let side = match self.side.as_deref() {
            None => {
                errors.push(FieldError {
                    field: "side",
                    reason: "is required".to_string(),
                });
                None
            }
            Some(raw) => match OrderSide::parse(raw) {
                Some(side) => Some(side),
                None => {
                    errors.push(FieldError {
                        field: "side",
                        reason: format!("must be \"buy\" or \"sell\" (got {raw:?})"),
                    });
                    None
                }
            },
        };

        // Defaults to market when absent
        let order_type = match self.order_type.as_deref() {
            None => Some(OrderType::Market),
            Some(raw) => match OrderType::parse(raw) {
                Some(order_type) => Some(order_type),
                None => {
                    errors.push(FieldError {
                        field: "order_type",
                        reason: format!("unrecognized order type {raw:?}"),
                    });
                    None
                }
            },
        };

        if let Some(volume) = self.volume {
            if volume <= Decimal::ZERO {
                errors.push(FieldError {
                    field: "volume",
                    reason: format!("must be positive (got {volume})"),
                });
            }
        }

        if let Some(order_type) = order_type {
            if order_type.requires_price() && self.price.is_none() {
                errors.push(FieldError {
                    field: "price",
                    reason: format!("is required for {order_type} orders"),
                });
            }
            if order_type.requires_stop_price() && self.stop_price.is_none() {
                errors.push(FieldError {
                    field: "stop_price",
                    reason: format!("is required for {order_type} orders"),
                });
            }
        }

        // Leverage is passed through unchecked; Kraken enforces its own limits.

        if !errors.is_empty() {
            return Err(ValidationError { fields: errors });
        }

        Ok(Alert {
            // Guarded by the error check above
            symbol: symbol.expect("validated"),
            side: side.expect("validated"),
            order_type: order_type.expect("validated"),
            volume: self.volume,
            price: self.price,
            stop_price: self.stop_price,
            leverage: self.leverage,
            strategy_name: self.strategy_name,
            alert_message: self.alert_message,
            custom_fields: self.custom_fields,
        })
    }
}
