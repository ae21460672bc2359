//! Service configuration
//!
//! Loaded once at startup from environment variables (a `.env` file is
//! honored via `dotenvy` in `main`). Secrets are never echoed back:
//! [`AppConfig::summary`] masks them for logging.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Deployment environment; controls config validation strictness and
/// whether internal error detail is exposed in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Development
    }
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" => Some(Self::Development),
            "staging" => Some(Self::Staging),
            "production" => Some(Self::Production),
            _ => None,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub environment: Environment,
    /// Shared secret for webhook signature verification. When unset,
    /// verification is skipped entirely.
    pub webhook_secret: Option<String>,
    pub kraken_api_key: Option<String>,
    pub kraken_api_secret: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// `ENVIRONMENT`, `WEBHOOK_SECRET`, `KRAKEN_API_KEY`,
    /// `KRAKEN_API_SECRET`. Empty values are treated as unset.
    pub fn from_env() -> Result<Self> {
        let environment = match env_var("ENVIRONMENT") {
            None => Environment::default(),
            Some(raw) => match Environment::parse(&raw) {
                Some(environment) => environment,
                None => bail!("Unrecognized ENVIRONMENT value: {raw:?}"),
            },
        };

        let config = Self {
            environment,
            webhook_secret: env_var("WEBHOOK_SECRET"),
            kraken_api_key: env_var("KRAKEN_API_KEY"),
            kraken_api_secret: env_var("KRAKEN_API_SECRET"),
        };
        config.check()?;
        Ok(config)
    }

    /// Validate required settings for the configured environment.
    ///
    /// Production refuses to start without credentials and a webhook
    /// secret; other environments only warn.
    pub fn check(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.kraken_api_key.is_none() {
            missing.push("KRAKEN_API_KEY");
        }
        if self.kraken_api_secret.is_none() {
            missing.push("KRAKEN_API_SECRET");
        }
        if self.webhook_secret.is_none() {
            missing.push("WEBHOOK_SECRET");
        }

        if missing.is_empty() {
            return Ok(());
        }

        if self.environment == Environment::Production {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        warn!(
            "Missing environment variables ({}): running with reduced functionality",
            missing.join(", ")
        );
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Loggable one-line summary with secrets masked
    pub fn summary(&self) -> String {
        fn mask(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "***"
            } else {
                "unset"
            }
        }
        format!(
            "environment={} webhook_secret={} kraken_api_key={} kraken_api_secret={}",
            self.environment,
            mask(&self.webhook_secret),
            mask(&self.kraken_api_key),
            mask(&self.kraken_api_secret),
        )
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
