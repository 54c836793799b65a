//! # Message Publisher
//!
//! Defines the publishing side of the message bus.

use crate::events::MessageFilter;
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use shared_types::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One registered subscriber: its filter and the sending half of its queue.
pub(crate) struct Subscriber {
    filter: MessageFilter,
    sender: mpsc::Sender<Message>,
}

/// Live subscribers by id.
pub(crate) type Registry = RwLock<HashMap<u64, Subscriber>>;

/// Trait for publishing messages to the bus.
///
/// This is the interface components use to emit messages for consumption
/// by the handlers registered for their type tag.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a message to the bus.
    ///
    /// # Returns
    ///
    /// The number of subscribers whose filter matched and whose queue
    /// accepted the message. Zero means nobody will ever see it.
    async fn publish(&self, message: Message) -> usize;

    /// Get the total number of messages published.
    fn messages_published(&self) -> u64;
}

/// In-memory implementation of the message bus.
///
/// Every subscription owns a bounded queue. Filters are applied when
/// publishing, and a full queue makes the publisher wait rather than drop
/// the message. Suitable for a single relayer process; a distributed
/// deployment would put a durable queue behind the same trait.
pub struct InMemoryMessageBus {
    registry: Arc<Registry>,

    next_id: AtomicU64,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Queue capacity of each subscription.
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus whose subscriptions buffer `capacity` messages.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to messages matching a filter.
    ///
    /// Only messages published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: MessageFilter) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.capacity);

        debug!(
            subscription = id,
            types = ?filter.types,
            destinations = ?filter.destinations,
            "New subscription created"
        );
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Subscriber { filter, sender });

        Subscription::new(id, receiver, Arc::downgrade(&self.registry))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get the per-subscription queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Senders of every subscriber whose filter matches `message`.
    fn matching(&self, message: &Message) -> Vec<(u64, mpsc::Sender<Message>)> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, subscriber)| subscriber.filter.matches(message))
            .map(|(id, subscriber)| (*id, subscriber.sender.clone()))
            .collect()
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryMessageBus {
    async fn publish(&self, message: Message) -> usize {
        let message_type = message.message_type();
        let source = message.source;
        let destination = message.destination;

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sender) in self.matching(&message) {
            // Waits while the subscriber's queue is full.
            match sender.send(message.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(id),
            }
        }
        if !closed.is_empty() {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            for id in &closed {
                registry.remove(id);
            }
        }

        if delivered == 0 {
            warn!(
                %message_type,
                source,
                destination,
                message_id = %message.id,
                "Message dropped (no matching subscribers)"
            );
        } else {
            debug!(
                %message_type,
                source,
                destination,
                message_id = %message.id,
                receivers = delivered,
                "Message published"
            );
        }
        delivered
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
