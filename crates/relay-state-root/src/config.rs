//! # State Root Configuration
//!
//! Already-validated per-domain settings injected into the orchestrator and
//! its event handlers at construction time.

use shared_types::{BlockNumber, DomainId};
use std::time::Duration;
use thiserror::Error;

/// Maximum number of blocks queried per log request.
pub const MAX_BLOCK_RANGE: u64 = 1000;

/// Default deadline for resolving a slot to an execution block.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of queued messages per destination worker.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Default number of remembered dispatched deposits.
pub const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("Missing required setting {key}")]
    Missing { key: String },

    /// A setting could not be parsed or is out of range.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Per-domain state-root relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRootConfig {
    /// Destination domain the handler is scoped to.
    pub domain_id: DomainId,
    /// Scan start used while no checkpoint exists.
    pub start_block: BlockNumber,
    /// Deadline for one block resolver call.
    pub resolve_timeout: Duration,
    /// Maximum blocks per log query.
    pub block_range_limit: u64,
    /// Queued messages per destination worker.
    pub mailbox_capacity: usize,
    /// Remembered dispatched deposits for re-scan suppression.
    pub dedup_capacity: usize,
}

impl StateRootConfig {
    /// Defaults for `domain_id`.
    pub fn new(domain_id: DomainId) -> Self {
        Self {
            domain_id,
            start_block: 0,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            block_range_limit: MAX_BLOCK_RANGE,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }

    pub fn with_start_block(mut self, start_block: BlockNumber) -> Self {
        self.start_block = start_block;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_block_range_limit(mut self, limit: u64) -> Self {
        self.block_range_limit = limit;
        self
    }

    /// Reject values the relay cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolve_timeout.is_zero() {
            return Err(invalid("RESOLVE_TIMEOUT", "0", "must be positive"));
        }
        if self.block_range_limit == 0 {
            return Err(invalid("BLOCK_RANGE_LIMIT", "0", "must be positive"));
        }
        if self.mailbox_capacity == 0 {
            return Err(invalid("MAILBOX_CAPACITY", "0", "must be positive"));
        }
        if self.dedup_capacity == 0 {
            return Err(invalid("DEDUP_CAPACITY", "0", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
