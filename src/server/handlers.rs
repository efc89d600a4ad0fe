//! Control-plane request handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use super::AppState;
use crate::engine::{FilterConfig, PayloadDiagnostics};
use crate::relay::{SubmitError, SubmitOutcome};

/// Error body `{ "error": ... }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        let status = match err {
            SubmitError::NoSubscribers => StatusCode::BAD_REQUEST,
            SubmitError::NotReady | SubmitError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

/// Body of `POST /api/configure-filter`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigureFilterRequest {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub max_letters: Option<i64>,
    pub domain_extensions: Option<Vec<String>>,
    pub keyword: Option<String>,
    pub seller_address: Option<String>,
}

impl ConfigureFilterRequest {
    /// Builds an enabled filter. Empty strings and a letter limit of zero
    /// or below mean "unset"; a missing upper price bound is unbounded.
    pub fn into_filter(self) -> FilterConfig {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        FilterConfig {
            min_price: self.min_price.unwrap_or(0.0),
            max_price: self.max_price.unwrap_or(f64::INFINITY),
            max_letters: self
                .max_letters
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0),
            domain_extensions: self
                .domain_extensions
                .unwrap_or_default()
                .into_iter()
                .map(|ext| ext.trim().to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
            keyword: non_empty(self.keyword),
            seller_address: non_empty(self.seller_address),
            enabled: true,
        }
    }
}

/// Body of `POST /api/trigger-telegram`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerRequest {
    pub message: Option<String>,
    pub response_data: Option<JsonValue>,
}

/// Body of `POST /api/test-price-extraction`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionRequest {
    pub response_data: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct ApiResponseDiagnostics {
    success: bool,
    raw_response: JsonValue,
    #[serde(flatten)]
    diagnostics: PayloadDiagnostics,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Rejected malformed request body");
        ApiError::internal(e.to_string())
    })
}

pub async fn configure_filter(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<JsonValue>, ApiError> {
    let request: ConfigureFilterRequest = parse_body(&body)?;
    state.relay.configure_filter(request.into_filter()).await;

    Ok(Json(json!({
        "success": true,
        "message": "Advanced filters configured successfully",
    })))
}

pub async fn trigger_telegram(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<JsonValue>, ApiError> {
    let request: TriggerRequest = parse_body(&body)?;
    let message = request.message.as_deref().unwrap_or("test");

    match state
        .relay
        .submit(message, request.response_data.as_ref())
        .await?
    {
        SubmitOutcome::Filtered => Ok(Json(json!({
            "success": true,
            "filtered": true,
            "message": "Message filtered out due to filter criteria",
        }))),
        SubmitOutcome::Enqueued { recipients } => {
            info!(recipients, "Broadcast triggered via control plane");
            Ok(Json(json!({
                "success": true,
                "message": format!("Broadcast triggered for {} users", recipients),
            })))
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "bot_connected": state.relay.is_ready(),
        "users_count": state.relay.subscribers().len().await,
        "advanced_filter": state.relay.filter().await,
    }))
}

pub async fn test_price_extraction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<JsonValue>, ApiError> {
    let request: ExtractionRequest = parse_body(&body)?;
    let payload = request.response_data.unwrap_or_else(|| json!({}));
    let (extracted, should_send) = state.relay.evaluate(&payload).await;

    Ok(Json(json!({
        "success": true,
        "extracted_data": extracted,
        "advanced_filter": state.relay.filter().await,
        "should_send": should_send,
    })))
}

pub async fn test_api_response(State(state): State<AppState>) -> Response {
    match state.upstream.poll_diagnostic().await {
        Ok(payload) => Json(ApiResponseDiagnostics {
            success: true,
            diagnostics: PayloadDiagnostics::inspect(&payload),
            raw_response: payload,
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Diagnostic upstream fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
