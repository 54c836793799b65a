//! # Message Subscriber
//!
//! Defines the subscription side of the message bus.

use crate::publisher::Registry;
use shared_types::Message;
use std::sync::{PoisonError, Weak};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The message bus was closed.
    #[error("Message bus closed")]
    Closed,
}

/// A subscription handle for receiving messages.
///
/// Holds only messages that matched its filter. When dropped, the
/// subscription leaves the bus and is no longer counted as a receiver.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Message>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, receiver: mpsc::Receiver<Message>, registry: Weak<Registry>) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    /// Receive the next message that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next matching message
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Try to receive the next message without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available
    /// - `Ok(None)` - No message available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<Message>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
        debug!(subscription = self.id, "Subscription dropped");
    }
}
