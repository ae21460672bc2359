//! Order Translation
//!
//! Maps a validated [`Alert`] into the Kraken `AddOrder` field set.
//! Translation is a total function: every failure mode is caught upstream
//! by schema validation, so [`OrderCommand::from_alert`] cannot fail.

use serde::Serialize;

use crate::alert::{Alert, OrderSide, OrderType};

/// An exchange-ready order, using Kraken's `AddOrder` field names.
///
/// All numeric values are carried as decimal strings; Kraken's private API
/// takes form-encoded string parameters and floating-point wire values
/// would lose precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderCommand {
    /// Trading pair in Kraken format (e.g. "XBTUSD")
    pub pair: String,
    /// Order side ("buy" or "sell"); Kraken calls this field `type`
    #[serde(rename = "type")]
    pub side: OrderSide,
    /// Kraken order type string
    pub ordertype: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Primary price: limit price, or trigger price for simple stop orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Secondary price: trigger price for stop-limit / take-profit-limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<String>,
    /// When set, Kraken validates the order without submitting it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<bool>,
    /// Comma-delimited order flags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oflags: Option<String>,
    /// User reference id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userref: Option<String>,
    /// Scheduled start time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starttm: Option<String>,
    /// Expiration time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiretm: Option<String>,
}

impl OrderCommand {
    /// Translate a validated alert into a Kraken order.
    ///
    /// Stop price routing follows the Kraken API shape: simple stop orders
    /// (`stop-loss`, `take-profit`) carry their trigger in the primary
    /// `price` field, while the compound `-limit` variants put the trigger
    /// in `price2` and keep the limit price in `price`.
    pub fn from_alert(alert: &Alert) -> Self {
        let mut command = Self {
            pair: alert.symbol.clone(),
            side: alert.side,
            ordertype: kraken_order_type(alert.order_type),
            volume: alert.volume.map(|v| v.to_string()),
            price: alert.price.map(|p| p.to_string()),
            price2: None,
            leverage: alert.leverage.map(|l| l.to_string()),
            validate: None,
            oflags: None,
            userref: None,
            starttm: None,
            expiretm: None,
        };

        if let Some(stop_price) = alert.stop_price {
            match alert.order_type {
                OrderType::StopLossLimit | OrderType::TakeProfitLimit => {
                    command.price2 = Some(stop_price.to_string());
                }
                _ => {
                    command.price = Some(stop_price.to_string());
                }
            }
        }

        command
    }

    /// Request dry-run evaluation instead of live submission.
    ///
    /// An endpoint-level concern applied after translation; the alert never
    /// carries this flag.
    pub fn with_validate_only(mut self) -> Self {
        self.validate = Some(true);
        self
    }

    /// Flatten into form parameters for the Kraken request body.
    ///
    /// Field order is fixed so the signed post data is deterministic.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("pair", self.pair.clone()),
            ("type", self.side.as_str().to_string()),
            ("ordertype", self.ordertype.to_string()),
        ];
        if let Some(ref volume) = self.volume {
            params.push(("volume", volume.clone()));
        }
        if let Some(ref price) = self.price {
            params.push(("price", price.clone()));
        }
        if let Some(ref price2) = self.price2 {
            params.push(("price2", price2.clone()));
        }
        if let Some(ref leverage) = self.leverage {
            params.push(("leverage", leverage.clone()));
        }
        if let Some(validate) = self.validate {
            params.push(("validate", validate.to_string()));
        }
        if let Some(ref oflags) = self.oflags {
            params.push(("oflags", oflags.clone()));
        }
        if let Some(ref userref) = self.userref {
            params.push(("userref", userref.clone()));
        }
        if let Some(ref starttm) = self.starttm {
            params.push(("starttm", starttm.clone()));
        }
        if let Some(ref expiretm) = self.expiretm {
            params.push(("expiretm", expiretm.clone()));
        }
        params
    }
}

/// Alert order type → Kraken `ordertype` string.
///
/// Identity mapping today; kept as an exhaustive match so an exchange-side
/// rename only touches this table.
fn kraken_order_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "market",
        OrderType::Limit => "limit",
        OrderType::StopLoss => "stop-loss",
        OrderType::TakeProfit => "take-profit",
        OrderType::StopLossLimit => "stop-loss-limit",
        OrderType::TakeProfitLimit => "take-profit-limit",
    }
}
