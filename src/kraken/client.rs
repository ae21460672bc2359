//! Kraken REST Client
//!
//! HTTP client for the Kraken REST API with private-endpoint request
//! signing. Private calls are signed with
//! `HMAC-SHA512(path ++ SHA256(nonce ++ postdata))` keyed with the
//! base64-decoded API secret, sent base64-encoded in the `API-Sign`
//! header.

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256, Sha512};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::models::{AddOrderResult, BalanceResult, KrakenResponse, OpenOrdersResult, ServerTime};
use crate::config::AppConfig;
use crate::order::OrderCommand;

type HmacSha512 = Hmac<Sha512>;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.kraken.com";

/// Kraken REST API client
pub struct KrakenClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl KrakenClient {
    /// Create a client from application config.
    ///
    /// Fails when either credential is missing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config
            .kraken_api_key
            .clone()
            .ok_or_else(|| anyhow!("Missing Kraken API key"))?;
        let api_secret = config
            .kraken_api_secret
            .clone()
            .ok_or_else(|| anyhow!("Missing Kraken API secret"))?;
        Ok(Self::new(api_key, api_secret, DEFAULT_BASE_URL.to_string()))
    }

    /// Create a client with explicit credentials
    pub fn new(api_key: String, api_secret: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
            api_key,
            api_secret,
        }
    }

    /// Millisecond timestamp nonce; Kraken requires it to be increasing
    fn nonce() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_millis() as u64
    }

    /// Compute the `API-Sign` header value for a private request
    fn sign(&self, path: &str, nonce: u64, postdata: &str) -> Result<String> {
        let key = BASE64
            .decode(&self.api_secret)
            .context("Kraken API secret is not valid base64")?;

        let mut sha = Sha256::new();
        sha.update(nonce.to_string().as_bytes());
        sha.update(postdata.as_bytes());
        let digest = sha.finalize();

        let mut mac =
            HmacSha512::new_from_slice(&key).expect("HMAC accepts any key length");
        mac.update(path.as_bytes());
        mac.update(digest.as_slice());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Query the public Time endpoint; used as a connectivity check
    pub async fn server_time(&self) -> Result<ServerTime> {
        let response = self
            .client
            .get(format!("{}/0/public/Time", self.base_url))
            .send()
            .await
            .context("Failed to reach Kraken public API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Kraken Time request failed with status {status}: {body}");
        }

        let envelope: KrakenResponse<ServerTime> = response
            .json()
            .await
            .context("Failed to parse Kraken Time response")?;
        if !envelope.is_ok() {
            bail!("Kraken API error: {}", envelope.error_message());
        }
        envelope
            .result
            .ok_or_else(|| anyhow!("Kraken Time response missing result"))
    }

    /// Submit an order via `AddOrder`.
    ///
    /// Returns the full envelope: Kraken-reported errors are a business
    /// outcome for the caller to interpret, not a transport failure.
    pub async fn add_order(
        &self,
        command: &OrderCommand,
    ) -> Result<KrakenResponse<AddOrderResult>> {
        self.private("AddOrder", command.to_params()).await
    }

    /// Fetch account balances
    pub async fn balance(&self) -> Result<KrakenResponse<BalanceResult>> {
        self.private("Balance", Vec::new()).await
    }

    /// Fetch open orders
    pub async fn open_orders(&self) -> Result<KrakenResponse<OpenOrdersResult>> {
        self.private("OpenOrders", Vec::new()).await
    }

    /// Signed POST to a private endpoint
    async fn private<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<KrakenResponse<T>> {
        let path = format!("/0/private/{endpoint}");
        let nonce = Self::nonce();

        let mut form: Vec<(&'static str, String)> = vec![("nonce", nonce.to_string())];
        form.extend(params);
        let postdata =
            serde_urlencoded::to_string(&form).context("Failed to encode request body")?;
        let signature = self.sign(&path, nonce, &postdata)?;

        debug!("POST {} nonce={}", path, nonce);

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("API-Key", &self.api_key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(postdata)
            .send()
            .await
            .with_context(|| format!("Failed to send {endpoint} request"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Kraken {endpoint} request failed with status {status}: {body}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {endpoint} response"))
    }
}
