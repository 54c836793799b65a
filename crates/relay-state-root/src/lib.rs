//! # relay-state-root
//!
//! Turns finalized state roots into scanned block ranges.
//!
//! ## Overview
//!
//! When a state root of this domain is committed on another domain, every
//! event emitted on this domain up to the state root's block becomes provable
//! there. This crate:
//! - **Resolves** the state root's consensus slot to an execution block
//! - **Scans** `[checkpoint, block]` with each registered event handler
//! - **Checkpoints** the block per (destination, source) pair on success
//!
//! ## Architecture
//!
//! ```text
//! Bus ──StateRoot──→ StateRootMailbox ──mpsc──→ StateRootWorker (one per domain)
//!                                                   │
//!                                                   └── StateRootHandler
//!                                                         ├── BlockFetcher   (beacon)
//!                                                         ├── BlockStorer    (checkpoints)
//!                                                         └── EventHandler[] (deposits ──Transfer──→ Bus)
//! ```
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | One message at a time per destination | worker owns the handler (`&mut self`) |
//! | No lost events | checkpoint written only after all handlers succeed |
//! | Re-scan safe | deposit handler remembers dispatched deposits |
//! | Panic isolation | worker catches panics, reports `Panicked` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_state_root::{StateRootConfig, StateRootHandler, StateRootWorker};
//!
//! let config = StateRootConfig::new(1).with_start_block(100);
//! let handler = StateRootHandler::new(&config, vec![deposits], fetcher, storer);
//! let (mailbox, task) = StateRootWorker::spawn(handler, config.mailbox_capacity);
//!
//! mailbox.submit(message).await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod worker;

/// Mock adapters (MockBlockFetcher, MockBlockStorer, etc.)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{
    BeaconBlockFetcher, DepositEventHandler, EthClient, EthDepositSource, EthLog,
    InMemoryBlockStorer,
};
pub use config::{ConfigError, StateRootConfig, MAX_BLOCK_RANGE};
pub use domain::{scan_start, BlockRange, CheckpointKey};
pub use error::{StateRootError, StateRootResult};
pub use ports::inbound::StateRootApi;
pub use ports::outbound::{BlockFetcher, BlockStorer, DepositLogSource, EventHandler};
pub use service::{HandlerStats, StateRootHandler};
pub use worker::{StateRootMailbox, StateRootWorker};
