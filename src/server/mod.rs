//! HTTP control plane for the companion website.
//!
//! Routes, all under `/api`:
//!   POST /configure-filter       → replace the active filter
//!   POST /trigger-telegram       → queue a message or payload for broadcast
//!   GET  /health                 → readiness, subscriber count, filter
//!   POST /test-price-extraction  → extraction and filter verdict for a payload
//!   GET  /test-api-response      → live upstream page with diagnostics
//!
//! Every response carries CORS headers for the configured origin and
//! preflight requests are answered with 204.

pub mod handlers;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::RelayError;
use crate::relay::Relay;
use crate::upstream::DomaClient;

pub use handlers::{ApiError, ConfigureFilterRequest, TriggerRequest};

/// Shared state for the control-plane routes.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub upstream: DomaClient,
}

/// Build the control-plane router.
pub fn router(state: AppState, allowed_origin: &str) -> Router {
    let origin = HeaderValue::from_str(allowed_origin).unwrap_or_else(|_| {
        warn!(allowed_origin, "Invalid CORS origin, allowing any origin");
        HeaderValue::from_static("*")
    });

    let api = Router::new()
        .route("/configure-filter", post(handlers::configure_filter))
        .route("/trigger-telegram", post(handlers::trigger_telegram))
        .route("/health", get(handlers::health))
        .route("/test-price-extraction", post(handlers::test_price_extraction))
        .route("/test-api-response", get(handlers::test_api_response))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(Arc::new(origin), cors))
}

async fn cors(State(origin): State<Arc<HeaderValue>>, request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    apply_cors_headers(response.headers_mut(), &origin);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: &HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Bind the control-plane listener.
///
/// # Errors
///
/// Returns `RelayError::Server` when the address cannot be bound.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, RelayError> {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Server(format!("failed to bind {}: {}", addr, e)))
}

/// Serve `app` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), RelayError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Control plane listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| RelayError::Server(e.to_string()))
}
