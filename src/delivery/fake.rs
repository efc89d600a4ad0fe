//! In-memory [`Messenger`] for tests
//!
//! [`RecordingMessenger`] records every successful send and can be told to
//! fail for specific chats, so broadcast behavior can be exercised without
//! a Telegram server.
//!
//! # Example
//!
//! ```
//! use doma_relay::delivery::fake::RecordingMessenger;
//! use doma_relay::delivery::{ChatId, Messenger};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let messenger = RecordingMessenger::new();
//! messenger.fail_for(ChatId(2), "bot was blocked by the user").await;
//!
//! assert!(messenger.send_text(ChatId(1), "hi").await.is_ok());
//! assert!(messenger.send_text(ChatId(2), "hi").await.is_err());
//! assert_eq!(messenger.sent().await, vec![(ChatId(1), "hi".to_string())]);
//! # }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::broadcaster::{Messenger, SendFailure};
use super::subscribers::ChatId;

/// Records sends; fails for configured chats.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(ChatId, String)>>,
    failures: Mutex<HashMap<ChatId, String>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `chat` fail with `description`.
    pub async fn fail_for(&self, chat: ChatId, description: &str) {
        self.failures
            .lock()
            .await
            .insert(chat, description.to_string());
    }

    /// Successful sends so far, in order.
    pub async fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().await.clone()
    }

    /// Successful sends to one chat, in order.
    pub async fn sent_to(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), SendFailure> {
        if let Some(description) = self.failures.lock().await.get(&chat) {
            return Err(SendFailure::new(description.clone()));
        }
        self.sent.lock().await.push((chat, text.to_string()));
        Ok(())
    }
}
