//! Message delivery to subscribers
//!
//! # Modules
//!
//! - [`queue`]: Unbounded FIFO between producers and the broadcaster
//! - [`subscribers`]: Shared set of subscribed chats
//! - [`broadcaster`]: Queue consumer and the [`Messenger`] seam
//! - [`fake`]: In-memory messenger for tests

pub mod broadcaster;
pub mod fake;
pub mod queue;
pub mod subscribers;

pub use broadcaster::{BroadcastReport, Broadcaster, Messenger, SendFailure};
pub use queue::{DeliveryError, DeliveryQueue, DeliveryReceiver};
pub use subscribers::{ChatId, SubscriberSet};
