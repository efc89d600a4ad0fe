//! Queue consumer that fans messages out to subscribers
//!
//! One [`Broadcaster`] task drains the [`DeliveryReceiver`], sending each
//! message to every subscriber present at that moment. Failures are
//! isolated per subscriber; chats that have blocked the bot are pruned.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::DeliveryReceiver;
use super::subscribers::{ChatId, SubscriberSet};

/// A failed send, carrying the messaging service's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub description: String,
}

impl SendFailure {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// Returns true when the recipient has blocked the bot.
    ///
    /// # Examples
    ///
    /// ```
    /// use doma_relay::delivery::SendFailure;
    ///
    /// assert!(SendFailure::new("Forbidden: Bot was blocked by the user").is_blocked());
    /// assert!(!SendFailure::new("Bad Request: chat not found").is_blocked());
    /// ```
    pub fn is_blocked(&self) -> bool {
        self.description.to_lowercase().contains("bot was blocked")
    }
}

impl std::fmt::Display for SendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

/// Outbound text delivery to a single chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), SendFailure>;
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
    pub pruned: usize,
}

/// Sends messages to all subscribers through a [`Messenger`].
#[derive(Clone)]
pub struct Broadcaster {
    messenger: Arc<dyn Messenger>,
    subscribers: SubscriberSet,
}

impl Broadcaster {
    pub fn new(messenger: Arc<dyn Messenger>, subscribers: SubscriberSet) -> Self {
        Self {
            messenger,
            subscribers,
        }
    }

    /// Sends `text` once to every current subscriber.
    ///
    /// Blocked chats are removed from the set and counted as `pruned`;
    /// other failures are logged and counted as `failed`.
    pub async fn broadcast(&self, text: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for chat in self.subscribers.snapshot().await {
            match self.messenger.send_text(chat, text).await {
                Ok(()) => report.delivered += 1,
                Err(failure) if failure.is_blocked() => {
                    self.subscribers.remove(chat).await;
                    report.pruned += 1;
                    info!(chat_id = %chat, "Removed subscriber that blocked the bot");
                }
                Err(failure) => {
                    report.failed += 1;
                    warn!(chat_id = %chat, error = %failure, "Failed to deliver message");
                }
            }
        }

        debug!(
            delivered = report.delivered,
            failed = report.failed,
            pruned = report.pruned,
            "Broadcast finished"
        );
        report
    }

    /// Consume the queue until cancelled or every producer is gone.
    ///
    /// On cancellation the queue is closed and the messages already in it
    /// are still delivered before returning.
    pub async fn run(&self, mut receiver: DeliveryReceiver, shutdown: CancellationToken) {
        info!("Broadcaster started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                message = receiver.next() => match message {
                    Some(message) => {
                        self.broadcast(&message).await;
                    }
                    None => {
                        info!("Delivery queue closed, broadcaster stopping");
                        return;
                    }
                },
            }
        }

        receiver.close();
        let mut drained = 0usize;
        while let Some(message) = receiver.try_next() {
            self.broadcast(&message).await;
            drained += 1;
        }
        info!(drained, "Broadcaster stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::fake::RecordingMessenger;
    use crate::delivery::queue::DeliveryQueue;

    async fn setup(chats: &[i64]) -> (Arc<RecordingMessenger>, SubscriberSet, Broadcaster) {
        let messenger = Arc::new(RecordingMessenger::new());
        let subscribers = SubscriberSet::new();
        for chat in chats {
            subscribers.add(ChatId(*chat)).await;
        }
        let broadcaster = Broadcaster::new(messenger.clone(), subscribers.clone());
        (messenger, subscribers, broadcaster)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let (messenger, _, broadcaster) = setup(&[1, 2, 3]).await;

        let report = broadcaster.broadcast("hi").await;
        assert_eq!(report.delivered, 3);
        assert_eq!(messenger.sent().await.len(), 3);
    }

    #[tokio::test]
    async fn test_blocked_subscriber_is_pruned() {
        let (messenger, subscribers, broadcaster) = setup(&[1, 2]).await;
        messenger
            .fail_for(ChatId(1), "Forbidden: bot was blocked by the user")
            .await;

        let report = broadcaster.broadcast("hi").await;
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                failed: 0,
                pruned: 1
            }
        );
        assert_eq!(subscribers.snapshot().await, vec![ChatId(2)]);
    }

    #[tokio::test]
    async fn test_other_failures_keep_subscriber() {
        let (messenger, subscribers, broadcaster) = setup(&[1, 2]).await;
        messenger.fail_for(ChatId(2), "Bad Request: chat not found").await;

        let report = broadcaster.broadcast("hi").await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(subscribers.len().await, 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_producers_gone() {
        let (messenger, _, broadcaster) = setup(&[7]).await;
        let (queue, receiver) = DeliveryQueue::new();
        queue.enqueue("a".to_string()).unwrap();
        queue.enqueue("b".to_string()).unwrap();
        drop(queue);

        broadcaster.run(receiver, CancellationToken::new()).await;

        let texts: Vec<String> = messenger.sent().await.into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_run_drains_on_cancel() {
        let (messenger, _, broadcaster) = setup(&[7]).await;
        let (queue, receiver) = DeliveryQueue::new();
        let shutdown = CancellationToken::new();
        for i in 0..5 {
            queue.enqueue(format!("m{}", i)).unwrap();
        }
        shutdown.cancel();

        broadcaster.run(receiver, shutdown).await;

        assert_eq!(messenger.sent().await.len(), 5);
        assert!(queue.is_closed());
    }
}
