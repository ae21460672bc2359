//! Webhook HTTP Surface
//!
//! Composes the request pipeline: signature check → JSON parse → schema
//! validation → order translation → gateway dispatch → response. Each
//! request is handled exactly once, synchronously, end to end; the first
//! failing stage terminates the request with its own HTTP status.
//!
//! # Routes
//!
//! - `POST /webhook/tradingview` - Receive an alert and submit a live order
//! - `POST /webhook/tradingview/validate` - Dry-run evaluation, no submission
//! - `GET /webhook/health` - Liveness probe
//! - `GET /` - Service info

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::alert::{Alert, AlertPayload, OrderSide, OrderType, ValidationError};
use crate::config::AppConfig;
use crate::gateway::{TradeGateway, TradeOutcome};
use crate::order::OrderCommand;
use crate::signature::{self, SignatureError};

/// Header carrying the hex HMAC-SHA256 signature of the request body
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Top-level payload fields masked before debug logging
const SENSITIVE_FIELDS: &[&str] = &["api_key", "api_secret", "key", "secret", "password", "token"];

/// Shared state injected into every handler
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn TradeGateway>,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook/tradingview", post(tradingview_webhook))
        .route("/webhook/tradingview/validate", post(validate_webhook))
        .route("/webhook/health", get(health))
        .route("/", get(root))
        .layer(middleware::from_fn(request_id))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// Request-terminating failures, each mapped to a distinct HTTP status
#[derive(Debug, Error)]
pub enum ApiError {
    /// Signature absent or mismatched → 401
    #[error(transparent)]
    Unauthorized(#[from] SignatureError),
    /// Body is not valid JSON → 400
    #[error("Invalid JSON payload: {0}")]
    MalformedJson(#[source] serde_json::Error),
    /// Semantically invalid alert → 400
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Anything unanticipated → 500, detail redacted outside development
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MalformedJson(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_response(self, development: bool) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Unauthorized(_) => "Signature verification failed",
            Self::MalformedJson(_) | Self::Validation(_) => "Invalid webhook payload",
            Self::Internal(_) => "Internal server error",
        };
        let error = match &self {
            Self::Internal(e) if development => format!("{e:#}"),
            Self::Internal(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        };
        (
            status,
            Json(json!({
                "success": false,
                "message": message,
                "error": error,
            })),
        )
            .into_response()
    }
}

// ============================================================================
// Response bodies
// ============================================================================

/// Echo of the alert fields that drove the order
#[derive(Debug, Serialize)]
pub struct TradeDetails {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub volume: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// JSON body returned by the webhook endpoints
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub trade_details: TradeDetails,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /webhook/tradingview - submit a live order
async fn tradingview_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_webhook(state, headers, body, false).await
}

/// POST /webhook/tradingview/validate - dry-run evaluation
async fn validate_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_webhook(state, headers, body, true).await
}

/// GET /webhook/health - liveness probe
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "krakenhook" }))
}

/// GET / - service info
async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": "TradingView to Kraken Webhook Service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "environment": state.config.environment,
    }))
}

async fn handle_webhook(
    state: Arc<AppState>,
    headers: HeaderMap,
    body: Bytes,
    dry_run: bool,
) -> Response {
    match process_alert(&state, &headers, &body, dry_run).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ApiError::Internal(inner) => {
                    error!("Unexpected error processing webhook: {inner:#}")
                }
                other => warn!("Webhook rejected: {other}"),
            }
            e.into_response(state.config.is_development())
        }
    }
}

/// The per-request pipeline. The gateway is only ever called with a
/// signature-checked, validated payload.
async fn process_alert(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
    dry_run: bool,
) -> Result<Response, ApiError> {
    // Verify over the exact raw bytes received; a re-serialized form could
    // reorder keys or change whitespace.
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    signature::verify(state.config.webhook_secret.as_deref(), provided, body)?;

    let raw: Value = serde_json::from_slice(body).map_err(ApiError::MalformedJson)?;
    debug!("Received webhook payload: {}", mask_payload(&raw));

    let payload: AlertPayload = serde_json::from_value(raw).map_err(ApiError::MalformedJson)?;
    let alert = payload.validate()?;
    info!(
        "Processed TradingView alert: {} {} {}",
        alert.symbol, alert.side, alert.order_type
    );

    let command = OrderCommand::from_alert(&alert);
    let outcome = if dry_run {
        state.gateway.dry_run(command).await
    } else {
        state.gateway.execute(command).await
    };

    Ok(trade_response(&alert, outcome, dry_run))
}

fn trade_response(alert: &Alert, outcome: TradeOutcome, dry_run: bool) -> Response {
    let message = match (dry_run, outcome.success) {
        (false, true) => "Order executed",
        (false, false) => "Order failed",
        (true, true) => "Validation successful",
        (true, false) => "Validation failed",
    };

    if outcome.success {
        info!(
            "{}: {} {} order_id={:?}",
            message, alert.symbol, alert.side, outcome.order_id
        );
    } else {
        error!(
            "{}: {} {} error={:?}",
            message, alert.symbol, alert.side, outcome.error
        );
    }

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    let response = WebhookResponse {
        success: outcome.success,
        message: message.to_string(),
        order_id: outcome.order_id,
        error: outcome.error,
        details: outcome.details,
        trade_details: TradeDetails {
            symbol: alert.symbol.clone(),
            side: alert.side,
            order_type: alert.order_type,
            volume: alert.volume,
            price: alert.price,
        },
    };
    (status, Json(response)).into_response()
}

// ============================================================================
// Middleware and helpers
// ============================================================================

/// Tag every request with a UUID, exposed in the `x-request-id` response
/// header and attached to the request's tracing span
async fn request_id(request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Last-resort handler for panics inside the pipeline; detail is never
/// exposed to the caller
fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("Panic while handling request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "Internal server error",
            "error": "An unexpected error occurred",
        })),
    )
        .into_response()
}

/// Copy of the payload with sensitive top-level fields masked for logging
fn mask_payload(value: &Value) -> Value {
    let mut masked = value.clone();
    if let Some(object) = masked.as_object_mut() {
        for field in SENSITIVE_FIELDS {
            if let Some(entry) = object.get_mut(*field) {
                *entry = Value::String("***".to_string());
            }
        }
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use std::sync::Mutex;
    use tower::util::ServiceExt;

    /// Gateway stub that records every command and returns a canned outcome
    struct StubGateway {
        outcome: TradeOutcome,
        calls: Mutex<Vec<(OrderCommand, bool)>>,
    }

    impl StubGateway {
        fn new(outcome: TradeOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(OrderCommand, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TradeGateway for StubGateway {
        async fn execute(&self, command: OrderCommand) -> TradeOutcome {
            self.calls.lock().unwrap().push((command, false));
            self.outcome.clone()
        }

        async fn dry_run(&self, command: OrderCommand) -> TradeOutcome {
            self.calls.lock().unwrap().push((command, true));
            self.outcome.clone()
        }
    }

    fn success_outcome() -> TradeOutcome {
        TradeOutcome::success(
            Some("OUF4EM-FRGI2-MQMWZD".to_string()),
            Some(json!({"kraken_response": {"txid": ["OUF4EM-FRGI2-MQMWZD"]}})),
        )
    }

    fn app(secret: Option<&str>, gateway: Arc<StubGateway>) -> Router {
        let config = Arc::new(AppConfig {
            webhook_secret: secret.map(str::to_string),
            ..Default::default()
        });
        router(Arc::new(AppState { config, gateway }))
    }

    fn post_json(uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_market_order_success() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(None, gateway.clone());

        let body = r#"{"symbol":"XBTUSD","side":"buy","order_type":"market","volume":0.001}"#;
        let response = app
            .oneshot(post_json("/webhook/tradingview", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["order_id"], "OUF4EM-FRGI2-MQMWZD");
        assert_eq!(json["trade_details"]["symbol"], "XBTUSD");
        assert_eq!(json["trade_details"]["volume"], "0.001");

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        let (command, dry_run) = &calls[0];
        assert_eq!(command.pair, "XBTUSD");
        assert_eq!(command.volume.as_deref(), Some("0.001"));
        assert!(!dry_run);
    }

    #[tokio::test]
    async fn test_missing_symbol_rejected() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(None, gateway.clone());

        let response = app
            .oneshot(post_json("/webhook/tradingview", r#"{"side":"buy"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("symbol"));
        // Gateway is never called with an invalid payload
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_side_rejected() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(None, gateway);

        let response = app
            .oneshot(post_json(
                "/webhook/tradingview",
                r#"{"symbol":"XBTUSD","side":"bogus"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("side"));
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(None, gateway);

        let response = app
            .oneshot(post_json("/webhook/tradingview", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("JSON"));
    }

    #[tokio::test]
    async fn test_wrong_signature_rejected() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(Some("shared-secret"), gateway.clone());

        let body = r#"{"symbol":"XBTUSD","side":"buy"}"#;
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/webhook/tradingview")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, "deadbeef")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_signature_rejected_when_secret_configured() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(Some("shared-secret"), gateway);

        let response = app
            .oneshot(post_json(
                "/webhook/tradingview",
                r#"{"symbol":"XBTUSD","side":"buy"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_correct_signature_accepted() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(Some("shared-secret"), gateway);

        let body = r#"{"symbol":"XBTUSD","side":"buy","volume":0.5}"#;
        let signature = signature::sign("shared-secret", body.as_bytes());
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/webhook/tradingview")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_validate_route_dispatches_dry_run() {
        let gateway = StubGateway::new(TradeOutcome::success(None, None));
        let app = app(None, gateway.clone());

        let response = app
            .oneshot(post_json(
                "/webhook/tradingview/validate",
                r#"{"symbol":"btcusd","side":"sell"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Validation successful");

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        let (command, dry_run) = &calls[0];
        assert_eq!(command.pair, "XBTUSD");
        assert!(dry_run);
    }

    #[tokio::test]
    async fn test_gateway_failure_maps_to_400_with_detail() {
        let gateway = StubGateway::new(TradeOutcome::failure(
            "Failed to initialize Kraken API",
            Some(json!({"retry_after": 60})),
        ));
        let app = app(None, gateway);

        let response = app
            .oneshot(post_json(
                "/webhook/tradingview",
                r#"{"symbol":"XBTUSD","side":"buy"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Order failed");
        assert_eq!(json["details"]["retry_after"], 60);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(None, gateway);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/webhook/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_request_id_header_present() {
        let gateway = StubGateway::new(success_outcome());
        let app = app(None, gateway);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/webhook/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn test_mask_payload_hides_sensitive_fields() {
        let masked = mask_payload(&json!({
            "symbol": "XBTUSD",
            "api_key": "k3y",
            "token": "t0k3n",
        }));
        assert_eq!(masked["symbol"], "XBTUSD");
        assert_eq!(masked["api_key"], "***");
        assert_eq!(masked["token"], "***");
    }
}
