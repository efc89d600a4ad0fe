//! Outbound message queue
//!
//! An unbounded FIFO from the producers (control plane, poller) to the
//! single broadcasting task. Enqueueing never blocks.

use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by the delivery layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The consuming side has shut down
    #[error("Delivery queue is closed")]
    QueueClosed,
}

/// Producer handle. Cheap to clone and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: mpsc::UnboundedSender<String>,
}

/// Consumer side, owned by the broadcaster.
#[derive(Debug)]
pub struct DeliveryReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl DeliveryQueue {
    /// Create a connected `(DeliveryQueue, DeliveryReceiver)` pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use doma_relay::delivery::DeliveryQueue;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let (queue, mut receiver) = DeliveryQueue::new();
    /// queue.enqueue("hello".to_string()).unwrap();
    /// assert_eq!(receiver.next().await.as_deref(), Some("hello"));
    /// # }
    /// ```
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, DeliveryReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, DeliveryReceiver { rx })
    }

    /// Append a message. Fails only when the receiver is gone.
    pub fn enqueue(&self, message: String) -> Result<(), DeliveryError> {
        self.tx
            .send(message)
            .map_err(|_| DeliveryError::QueueClosed)
    }

    /// Returns true once the receiver has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl DeliveryReceiver {
    /// Wait for the next message; `None` when every producer is gone and
    /// the queue is empty.
    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take a queued message without waiting.
    pub fn try_next(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting new messages. Already queued messages stay readable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
