//! Doma marketplace API client.
//!
//! Fetches pages of marketplace events from the poll endpoint and
//! acknowledges consumed cursors.
//!
//! # Example
//!
//! ```rust,no_run
//! use doma_relay::upstream::{DomaClient, DomaClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DomaClient::new(DomaClientConfig {
//!         api_key: "your-api-key".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     let page = client.poll().await?;
//!     if let Some(last_id) = doma_relay::upstream::last_id(&page) {
//!         client.ack(&last_id).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;
use crate::engine::extractor::display_value;

/// Errors that can occur while talking to the marketplace API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// HTTP request error (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API error with status code.
    #[error("API returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },
}

/// Marketplace API client configuration.
#[derive(Debug, Clone)]
pub struct DomaClientConfig {
    /// Base URL of the API, without trailing path.
    pub base_url: String,
    /// Value of the `Api-Key` header.
    pub api_key: String,
    /// Event types requested from the poll endpoint.
    pub event_types: Vec<String>,
    /// Maximum events per page.
    pub limit: u32,
    /// Budget for routine polls.
    pub poll_timeout: Duration,
    /// Budget for diagnostic fetches.
    pub diagnostic_timeout: Duration,
}

impl Default for DomaClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-testnet.doma.xyz".to_string(),
            api_key: String::new(),
            event_types: vec!["NAME_TOKEN_LISTED".to_string()],
            limit: 1,
            poll_timeout: Duration::from_millis(900),
            diagnostic_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&UpstreamConfig> for DomaClientConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            event_types: config.event_types.clone(),
            limit: config.limit,
            poll_timeout: Duration::from_millis(config.poll_timeout_ms),
            diagnostic_timeout: Duration::from_secs(config.diagnostic_timeout_secs),
        }
    }
}

/// Marketplace API client.
#[derive(Debug, Clone)]
pub struct DomaClient {
    client: Client,
    config: DomaClientConfig,
}

impl DomaClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Http` if the HTTP client cannot be created.
    pub fn new(config: DomaClientConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Builds a request with the API key header.
    fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        self.client
            .request(method, &url)
            .header("Api-Key", &self.config.api_key)
    }

    /// Fetches one page using the routine poll budget.
    pub async fn poll(&self) -> Result<JsonValue, UpstreamError> {
        self.poll_with_timeout(self.config.poll_timeout).await
    }

    /// Fetches one page using the diagnostic budget.
    pub async fn poll_diagnostic(&self) -> Result<JsonValue, UpstreamError> {
        self.poll_with_timeout(self.config.diagnostic_timeout).await
    }

    /// Fetches one page of events.
    ///
    /// A 200 response whose body is not JSON is returned wrapped as
    /// `{"raw_response": "<text>"}`.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Api` on any non-200 status.
    pub async fn poll_with_timeout(&self, timeout: Duration) -> Result<JsonValue, UpstreamError> {
        let query = [
            ("eventTypes", self.config.event_types.join(",")),
            ("limit", self.config.limit.to_string()),
        ];

        let response = self
            .build_request(Method::GET, "/v1/poll")
            .query(&query)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), "Upstream poll failed");
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        match serde_json::from_str::<JsonValue>(&body) {
            Ok(payload) => {
                debug!(has_events = has_events(&payload), "Upstream poll succeeded");
                Ok(payload)
            }
            Err(e) => {
                debug!(error = %e, "Upstream returned non-JSON body");
                Ok(serde_json::json!({ "raw_response": body }))
            }
        }
    }

    /// Acknowledges every event up to and including `last_id`.
    pub async fn ack(&self, last_id: &str) -> Result<(), UpstreamError> {
        let response = self
            .build_request(Method::POST, &format!("/v1/poll/ack/{}", last_id))
            .timeout(self.config.diagnostic_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(last_id, "Acknowledged upstream events");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(UpstreamError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

/// The `lastId` cursor of a poll page, as text.
pub fn last_id(payload: &JsonValue) -> Option<String> {
    payload
        .get("lastId")
        .filter(|v| !v.is_null())
        .map(display_value)
}

/// Returns true when the page carries at least one event.
pub fn has_events(payload: &JsonValue) -> bool {
    payload
        .get("events")
        .and_then(JsonValue::as_array)
        .is_some_and(|events| !events.is_empty())
}
