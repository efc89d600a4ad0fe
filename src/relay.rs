//! Shared relay state
//!
//! [`Relay`] owns everything the control plane, the bot and the poller
//! share: the active filter, the subscriber set, the queue producer and
//! the bot readiness flag. It is cheap to clone; clones share state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::delivery::{DeliveryError, DeliveryQueue, SubscriberSet};
use crate::engine::{extract, should_deliver, ExtractedFields, FilterConfig, NotificationFormatter};

/// Why a submission was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("No users to send message to. Users need to start the bot first with /start command.")]
    NoSubscribers,

    #[error("Bot not initialized")]
    NotReady,

    #[error(transparent)]
    Queue(#[from] DeliveryError),
}

/// Result of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Message queued for this many current subscribers
    Enqueued { recipients: usize },
    /// Payload rejected by the active filter; nothing queued
    Filtered,
}

/// Coordinating handle shared by every task.
#[derive(Debug, Clone)]
pub struct Relay {
    filter: Arc<RwLock<FilterConfig>>,
    subscribers: SubscriberSet,
    queue: DeliveryQueue,
    formatter: NotificationFormatter,
    ready: Arc<AtomicBool>,
}

impl Relay {
    pub fn new(
        queue: DeliveryQueue,
        subscribers: SubscriberSet,
        formatter: NotificationFormatter,
    ) -> Self {
        Self {
            filter: Arc::new(RwLock::new(FilterConfig::default())),
            subscribers,
            queue,
            formatter,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribers(&self) -> &SubscriberSet {
        &self.subscribers
    }

    /// Replace the active filter. Last write wins.
    pub async fn configure_filter(&self, config: FilterConfig) {
        info!(filter = %config.summary(), "Filter configured");
        *self.filter.write().await = config;
    }

    /// Copy of the active filter.
    pub async fn filter(&self) -> FilterConfig {
        self.filter.read().await.clone()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Extract fields from `payload` and evaluate the active filter.
    pub async fn evaluate(&self, payload: &JsonValue) -> (ExtractedFields, bool) {
        let extracted = extract(payload);
        if extracted.is_empty() {
            debug!("No listing fields found in payload");
        }
        let filter = self.filter().await;
        let pass = should_deliver(&extracted, &filter);
        (extracted, pass)
    }

    /// Queue a message for broadcast.
    ///
    /// With a non-empty `response_data` payload the message is built from
    /// the payload, subject to the filter; otherwise `message` is queued
    /// as given.
    pub async fn submit(
        &self,
        message: &str,
        response_data: Option<&JsonValue>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let recipients = self.subscribers.len().await;
        if recipients == 0 {
            return Err(SubmitError::NoSubscribers);
        }
        if !self.is_ready() {
            return Err(SubmitError::NotReady);
        }

        let text = match response_data.filter(|data| has_content(data)) {
            Some(payload) => {
                let (extracted, pass) = self.evaluate(payload).await;
                if !pass {
                    debug!(name = ?extracted.name, "Payload filtered out");
                    return Ok(SubmitOutcome::Filtered);
                }
                self.formatter.format(&extracted, payload)
            }
            None => message.to_string(),
        };

        self.queue.enqueue(text)?;
        info!(recipients, "Broadcast queued");
        Ok(SubmitOutcome::Enqueued { recipients })
    }
}

/// Null, `false`, zero and empty strings, arrays and objects carry no
/// payload.
fn has_content(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
    }
}
