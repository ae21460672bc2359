//! Webhook Signature Verification
//!
//! Verifies the `X-Signature` header sent with webhook requests: a
//! hex-encoded HMAC-SHA256 of the raw request body, keyed with the shared
//! webhook secret. The digest must be computed over the exact bytes
//! received; re-serializing the parsed JSON can reorder keys or change
//! whitespace and would break verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Signature verification failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("invalid signature")]
    Invalid,
}

/// Verify a webhook signature against the raw request body.
///
/// When no secret is configured, verification is skipped with a warning:
/// a deliberate permissive default for local development. With a secret
/// configured, an absent header fails with [`SignatureError::Missing`] and
/// a mismatched digest with [`SignatureError::Invalid`]. Comparison is
/// constant-time via [`Mac::verify_slice`].
pub fn verify(
    secret: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), SignatureError> {
    let Some(secret) = secret else {
        warn!("Webhook signature verification skipped: no webhook secret configured");
        return Ok(());
    };

    let signature = signature.ok_or(SignatureError::Missing)?;
    let digest = hex::decode(signature.trim()).map_err(|_| SignatureError::Invalid)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&digest).map_err(|_| SignatureError::Invalid)?;

    debug!("Webhook signature verified");
    Ok(())
}

/// Compute the hex-encoded HMAC-SHA256 signature for a body.
///
/// What a sender must put in the `X-Signature` header.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
