//! # Message Filters
//!
//! Subscription filters over the cross-domain `Message` envelope.

use shared_types::{DomainId, Message, MessageType};

/// Filter for subscribing to specific messages.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Type tags to include. Empty means all types.
    pub types: Vec<MessageType>,
    /// Destination domains to include. Empty means all destinations.
    pub destinations: Vec<DomainId>,
}

impl MessageFilter {
    /// Create a filter that accepts all messages.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific type tags.
    #[must_use]
    pub fn types(types: Vec<MessageType>) -> Self {
        Self {
            types,
            destinations: Vec::new(),
        }
    }

    /// Restrict the filter to messages for specific destinations.
    #[must_use]
    pub fn to_destinations(mut self, destinations: Vec<DomainId>) -> Self {
        self.destinations = destinations;
        self
    }

    /// Check if a message matches this filter.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        let type_match = self.types.is_empty() || self.types.contains(&message.message_type());

        let destination_match =
            self.destinations.is_empty() || self.destinations.contains(&message.destination);

        type_match && destination_match
    }
}
