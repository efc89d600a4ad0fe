//! In-memory subscriber registry

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Telegram chat identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of chats that receive broadcasts. Shared by cloning.
///
/// Lives for the process lifetime only.
#[derive(Debug, Clone, Default)]
pub struct SubscriberSet {
    inner: Arc<RwLock<BTreeSet<ChatId>>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chat; returns true if it was not already subscribed.
    pub async fn add(&self, chat: ChatId) -> bool {
        self.inner.write().await.insert(chat)
    }

    /// Removes a chat; returns true if it was subscribed.
    pub async fn remove(&self, chat: ChatId) -> bool {
        self.inner.write().await.remove(&chat)
    }

    /// Copy of the current members, in ascending order.
    pub async fn snapshot(&self) -> Vec<ChatId> {
        self.inner.read().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
