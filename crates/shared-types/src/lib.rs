//! # Shared Types Crate
//!
//! This crate contains the cross-domain data model used by every relay
//! component: raw on-chain events, the `Message` envelope and the payloads
//! it carries between domains.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-component types are defined here.
//! - **Tagged Payloads**: A `Message` carries a `MessagePayload` sum type; its
//!   `MessageType` tag is derived from the variant and can never disagree with it.
//! - **Attributable Flows**: Every envelope carries `source`, `destination` and
//!   a correlation `id` so any log line can be traced back to one cross-chain flow.

pub mod abi;
pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::{Message, MessagePayload, MessageType, StateRootData, TransferData};
pub use errors::*;
