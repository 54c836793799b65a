//! Error types for the state-root relay
//!
//! Errors fall into three classes that drive the delivery layer's retry
//! policy: resolution errors, scan errors and checkpoint errors. The
//! orchestrator never retries internally.

use shared_types::{DomainId, EventDecodeError, MessageError, U256};
use std::time::Duration;
use thiserror::Error;

/// State-root relay errors
#[derive(Debug, Error)]
pub enum StateRootError {
    /// Slot unknown, not finalized, or without an execution payload
    #[error("Slot {slot} could not be resolved: {reason}")]
    Resolution { slot: U256, reason: String },

    /// Block resolver did not answer within the deadline
    #[error("Resolving slot {slot} timed out after {timeout:?}")]
    ResolutionTimeout { slot: U256, timeout: Duration },

    /// Checkpoint store read or write failed
    #[error("Checkpoint store failed for {destination}-{source_domain}: {reason}")]
    Checkpoint {
        destination: DomainId,
        source_domain: DomainId,
        reason: String,
    },

    /// An event handler failed while scanning a range
    #[error("Event handler `{handler}` failed: {reason}")]
    Scan { handler: String, reason: String },

    /// An event handler panicked
    #[error("Event handling for domain {destination} panicked: {reason}")]
    Panicked {
        destination: DomainId,
        reason: String,
    },

    /// Message routed to the wrong handler
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Upstream RPC transport or status error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Upstream response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// No worker accepts messages for the domain
    #[error("No state root worker for domain {domain}")]
    WorkerUnavailable { domain: DomainId },
}

impl StateRootError {
    /// Whether re-delivering the same message may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Resolution { .. }
            | Self::ResolutionTimeout { .. }
            | Self::Checkpoint { .. }
            | Self::Scan { .. }
            | Self::Panicked { .. }
            | Self::Rpc(_) => true,
            Self::Message(_) | Self::Decode(_) | Self::WorkerUnavailable { .. } => false,
        }
    }
}

impl From<EventDecodeError> for StateRootError {
    fn from(err: EventDecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for state-root relay operations
pub type StateRootResult<T> = Result<T, StateRootError>;
