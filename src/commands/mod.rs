/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `serve`   - Run the relay: bot, broadcaster, control plane, poller
- `poll`    - Fetch one upstream page and print its inspection report
- `extract` - Inspect a saved payload offline
*/

use crate::config::Config;
use crate::engine::{extract, NotificationFormatter, PayloadDiagnostics};
use crate::error::Result;
use serde_json::{json, Value as JsonValue};

/// Builds the report printed by `poll` and `extract`: diagnostics, the
/// unfiltered notification preview, and the raw payload.
pub fn inspection_report(payload: &JsonValue, formatter: &NotificationFormatter) -> JsonValue {
    let extracted = extract(payload);
    json!({
        "notification": formatter.format(&extracted, payload),
        "diagnostics": PayloadDiagnostics::inspect(payload),
        "raw_response": payload,
    })
}

fn formatter_for(config: &Config) -> NotificationFormatter {
    NotificationFormatter::new(config.notification.explorer_base.clone())
}

fn print_report(report: &JsonValue) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

// Relay command handler
pub mod serve {
    //! Long-running relay.
    //!
    //! Wires the shared [`Relay`] into the Telegram bot, the broadcaster,
    //! the control plane and the optional poller, then runs until Ctrl-C
    //! or until the bot fails to start.

    use super::*;
    use crate::delivery::{Broadcaster, DeliveryQueue, SubscriberSet};
    use crate::error::RelayError;
    use crate::poller::Poller;
    use crate::relay::Relay;
    use crate::server::{self, AppState};
    use crate::telegram::{TelegramBot, TelegramClient, TelegramClientConfig};
    use crate::upstream::{DomaClient, DomaClientConfig};
    use crate::website::WebsiteFetcher;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing::{error, info};

    /// Run the relay until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the bot token is missing, the control-plane
    /// listener cannot be bound, or the bot cannot authenticate.
    pub async fn run_serve(config: Config) -> Result<()> {
        config.require_credentials()?;

        let shutdown = CancellationToken::new();
        let (queue, receiver) = DeliveryQueue::new();
        let subscribers = SubscriberSet::new();
        let relay = Relay::new(queue, subscribers.clone(), formatter_for(&config));

        let upstream =
            DomaClient::new(DomaClientConfig::from(&config.upstream)).map_err(RelayError::from)?;
        let telegram = TelegramClient::new(TelegramClientConfig::from(&config.telegram))
            .map_err(RelayError::from)?;
        let website = WebsiteFetcher::new(&config.website).map_err(RelayError::from)?;

        let listener = server::bind(&config.server.host, config.server.port).await?;
        let app = server::router(
            AppState {
                relay: relay.clone(),
                upstream: upstream.clone(),
            },
            &config.server.allowed_origin,
        );

        let broadcaster = Broadcaster::new(Arc::new(telegram.clone()), subscribers);
        let bot = TelegramBot::new(telegram, relay.clone(), upstream.clone(), website);

        let mut tasks = Vec::new();

        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            broadcaster.run(receiver, token).await;
            Ok::<(), RelayError>(())
        }));

        tasks.push(tokio::spawn(server::serve(listener, app, shutdown.clone())));

        if config.poller.enabled {
            let poller = Poller::new(
                upstream,
                relay,
                Duration::from_secs(config.poller.interval_secs),
            );
            let token = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                poller.run(token).await;
                Ok(())
            }));
        } else {
            info!("In-process poller disabled");
        }

        let bot_result = tokio::select! {
            result = bot.run(shutdown.clone()) => result.map_err(RelayError::from),
            signal = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                signal.map_err(RelayError::from)
            }
        };

        shutdown.cancel();
        for joined in futures::future::join_all(tasks).await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Task failed"),
                Err(e) => error!(error = %e, "Task panicked"),
            }
        }

        info!("Relay stopped");
        bot_result.map_err(Into::into)
    }
}

// Upstream inspection handler
pub mod poll {
    //! One-shot upstream fetch.

    use super::*;
    use crate::upstream::{last_id, DomaClient, DomaClientConfig};

    /// Fetch one page, print its inspection report, optionally ack it
    ///
    /// # Errors
    ///
    /// Returns error if the upstream request or the acknowledgement fails
    pub async fn run_poll(config: Config, ack: bool) -> Result<()> {
        let client = DomaClient::new(DomaClientConfig::from(&config.upstream))?;
        let payload = client.poll_diagnostic().await?;

        print_report(&inspection_report(&payload, &formatter_for(&config)))?;

        if ack {
            match last_id(&payload) {
                Some(cursor) => client.ack(&cursor).await?,
                None => tracing::warn!("Response has no lastId, nothing to acknowledge"),
            }
        }
        Ok(())
    }
}

// Offline payload inspection handler
pub mod extract {
    //! Offline extraction over a saved payload file.

    use super::*;
    use anyhow::Context;
    use std::path::Path;

    /// Read a JSON payload from `file` and print its inspection report
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid JSON
    pub fn run_extract(config: &Config, file: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read payload file {}", file.display()))?;
        let payload: JsonValue = serde_json::from_str(&contents)
            .with_context(|| format!("Payload file {} is not valid JSON", file.display()))?;

        print_report(&inspection_report(&payload, &formatter_for(config)))
    }
}
