//! In-process upstream poller
//!
//! Periodically fetches a page of marketplace events and submits it
//! through the relay, the same path the control plane's trigger endpoint
//! uses, then acknowledges the page cursor.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::relay::{Relay, SubmitOutcome};
use crate::upstream::{has_events, last_id, DomaClient, UpstreamError};

/// What a single poll round did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollRound {
    /// The page carried no events
    Empty,
    /// Events were handed to the relay
    Submitted(SubmitOutcome),
    /// The relay refused the submission
    Skipped(String),
}

/// Periodic upstream poller.
pub struct Poller {
    upstream: DomaClient,
    relay: Relay,
    interval: Duration,
}

impl Poller {
    pub fn new(upstream: DomaClient, relay: Relay, interval: Duration) -> Self {
        Self {
            upstream,
            relay,
            interval,
        }
    }

    /// Poll every `interval` until cancelled. Round failures are logged.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Poller started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "Poll round failed");
                    }
                }
            }
        }
        info!("Poller stopped");
    }

    /// Fetch one page, submit it when it has events, then ack its cursor.
    ///
    /// Ack failures are logged, not returned.
    pub async fn poll_once(&self) -> Result<PollRound, UpstreamError> {
        let payload = self.upstream.poll().await?;

        let round = if has_events(&payload) {
            match self.relay.submit("", Some(&payload)).await {
                Ok(outcome) => PollRound::Submitted(outcome),
                Err(e) => {
                    info!(reason = %e, "Skipping poll result");
                    PollRound::Skipped(e.to_string())
                }
            }
        } else {
            debug!("No new events");
            PollRound::Empty
        };

        if let Some(cursor) = last_id(&payload) {
            if let Err(e) = self.upstream.ack(&cursor).await {
                warn!(last_id = %cursor, error = %e, "Failed to acknowledge events");
            }
        }

        Ok(round)
    }
}
