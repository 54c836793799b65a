//! # Shared Bus - Cross-Domain Message Bus
//!
//! Delivers typed `Message`s to the components registered for their type tag.
//!
//! ## Delivery Contract
//!
//! - **At-least-once:** consumers must tolerate re-delivery of the same message.
//! - **No silent loss:** a full subscriber queue makes the publisher wait, and
//!   `publish` counts only subscribers whose filter matched.
//! - **No reordering guarantees across publishers:** ordering only holds for
//!   messages published by a single task.
//! - **Filtered fan-out:** every subscriber sees every published message that
//!   matches its `MessageFilter`.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Listener   │                    │    Router    │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │ Message Bus  │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::MessageFilter;
pub use publisher::{InMemoryMessageBus, MessagePublisher};
pub use subscriber::{Subscription, SubscriptionError};

/// Messages buffered per subscriber before publishers wait.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
