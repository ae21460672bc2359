//! Kraken Trade Executor
//!
//! Implements [`TradeGateway`] on top of [`KrakenClient`]. The client is
//! initialized lazily on first use; a failed initialization parks the
//! executor in a cooldown so concurrent requests do not each hammer the
//! exchange with reconnect attempts. Requests arriving during the cooldown
//! all observe the same "not available" outcome.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::client::KrakenClient;
use crate::config::AppConfig;
use crate::gateway::{TradeGateway, TradeOutcome};
use crate::order::OrderCommand;

/// Minimum interval between failed initialization attempts
pub const INIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Gateway client lifecycle
enum GatewayState {
    Uninitialized,
    Ready(Arc<KrakenClient>),
    Cooldown { since: Instant },
}

/// Trade gateway backed by the Kraken REST API
pub struct KrakenExecutor {
    config: Arc<AppConfig>,
    state: Mutex<GatewayState>,
}

impl KrakenExecutor {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            state: Mutex::new(GatewayState::Uninitialized),
        }
    }

    /// Get the initialized client, initializing it if due.
    ///
    /// Returns `None` while the cooldown is active or when initialization
    /// fails. The lock is held across initialization so concurrent callers
    /// share one attempt.
    async fn ensure_client(&self) -> Option<Arc<KrakenClient>> {
        let mut state = self.state.lock().await;

        match &*state {
            GatewayState::Ready(client) => return Some(client.clone()),
            GatewayState::Cooldown { since } if since.elapsed() < INIT_COOLDOWN => {
                debug!("Skipping Kraken initialization: cooldown active");
                return None;
            }
            _ => {}
        }

        match self.initialize().await {
            Ok(client) => {
                info!("Successfully initialized Kraken API client");
                let client = Arc::new(client);
                *state = GatewayState::Ready(client.clone());
                Some(client)
            }
            Err(e) => {
                error!("Failed to initialize Kraken API client: {e:#}");
                *state = GatewayState::Cooldown {
                    since: Instant::now(),
                };
                None
            }
        }
    }

    async fn initialize(&self) -> Result<KrakenClient> {
        let client = KrakenClient::from_config(&self.config)?;
        let time = client
            .server_time()
            .await
            .context("Kraken connectivity check failed")?;
        debug!("Kraken server time: {}", time.unixtime);
        Ok(client)
    }

    fn unavailable() -> TradeOutcome {
        TradeOutcome::failure(
            "Failed to initialize Kraken API",
            Some(json!({ "retry_after": INIT_COOLDOWN.as_secs() })),
        )
    }

    async fn submit(&self, command: OrderCommand) -> TradeOutcome {
        let Some(client) = self.ensure_client().await else {
            return Self::unavailable();
        };

        let validate_only = command.validate == Some(true);
        info!(
            "Submitting {} {} order for {}{}",
            command.side,
            command.ordertype,
            command.pair,
            if validate_only { " (dry run)" } else { "" }
        );

        let envelope = match client.add_order(&command).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Kraken AddOrder request failed: {e:#}");
                return TradeOutcome::failure(format!("Kraken request failed: {e:#}"), None);
            }
        };

        if !envelope.is_ok() {
            error!("Kraken rejected order: {}", envelope.error_message());
            return TradeOutcome::failure(
                format!("Kraken API error: {}", envelope.error_message()),
                Some(json!({ "kraken_error": envelope.error })),
            );
        }

        let details = envelope
            .result
            .as_ref()
            .and_then(|r| serde_json::to_value(r).ok())
            .map(|v| json!({ "kraken_response": v }));

        if let Some(result) = envelope.result {
            if let Some(order_id) = result.txid.first() {
                info!("Order submitted successfully: {}", order_id);
                return TradeOutcome::success(Some(order_id.clone()), details);
            }
            // Validate-only calls return a description but no txid
            if validate_only {
                info!("Order validated by Kraken");
                return TradeOutcome::success(None, details);
            }
        }

        warn!("Unexpected response from Kraken API");
        TradeOutcome::failure("Unexpected response from Kraken API", details)
    }

    /// Fetch account balances as decimals, keyed by Kraken asset name
    pub async fn account_balance(&self) -> Result<HashMap<String, Decimal>> {
        let client = self
            .ensure_client()
            .await
            .ok_or_else(|| anyhow!("Kraken gateway not available"))?;

        let envelope = client.balance().await?;
        if !envelope.is_ok() {
            bail!("Kraken API error: {}", envelope.error_message());
        }

        let mut balances = HashMap::new();
        for (asset, amount) in envelope.result.unwrap_or_default() {
            let amount: Decimal = amount
                .parse()
                .with_context(|| format!("Unparseable balance for {asset}: {amount:?}"))?;
            balances.insert(asset, amount);
        }
        Ok(balances)
    }

    /// Fetch open orders, keyed by order id
    pub async fn open_orders(&self) -> Result<HashMap<String, serde_json::Value>> {
        let client = self
            .ensure_client()
            .await
            .ok_or_else(|| anyhow!("Kraken gateway not available"))?;

        let envelope = client.open_orders().await?;
        if !envelope.is_ok() {
            bail!("Kraken API error: {}", envelope.error_message());
        }
        Ok(envelope.result.map(|r| r.open).unwrap_or_default())
    }
}

#[async_trait]
impl TradeGateway for KrakenExecutor {
    async fn execute(&self, command: OrderCommand) -> TradeOutcome {
        self.submit(command).await
    }

    async fn dry_run(&self, command: OrderCommand) -> TradeOutcome {
        self.submit(command.with_validate_only()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertPayload;

    fn market_order() -> OrderCommand {
        let alert = serde_json::from_value::<AlertPayload>(serde_json::json!({
            "symbol": "XBTUSD",
            "side": "buy",
            "volume": 0.001,
        }))
        .unwrap()
        .validate()
        .unwrap();
        OrderCommand::from_alert(&alert)
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_with_retry_hint() {
        let executor = KrakenExecutor::new(Arc::new(AppConfig::default()));
        let outcome = executor.execute(market_order()).await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.details.unwrap()["retry_after"],
            INIT_COOLDOWN.as_secs()
        );
    }

    #[tokio::test]
    async fn test_failed_init_parks_in_cooldown() {
        let executor = KrakenExecutor::new(Arc::new(AppConfig::default()));
        let _ = executor.execute(market_order()).await;

        {
            let state = executor.state.lock().await;
            assert!(matches!(&*state, GatewayState::Cooldown { .. }));
        }

        // Second call during cooldown observes the same outcome without a
        // fresh initialization attempt
        let outcome = executor.dry_run(market_order()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.details.unwrap()["retry_after"], 60);
    }

    #[tokio::test]
    async fn test_balance_unavailable_without_client() {
        let executor = KrakenExecutor::new(Arc::new(AppConfig::default()));
        assert!(executor.account_balance().await.is_err());
        assert!(executor.open_orders().await.is_err());
    }
}
