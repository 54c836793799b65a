//! Checkpoint keys and cursor semantics
//!
//! A checkpoint is the last execution block whose events have been fully
//! dispatched for one (destination, source) pair. It is only ever advanced
//! after every event handler succeeded for a range, and never moves backwards.

use serde::{Deserialize, Serialize};
use shared_types::{BlockNumber, DomainId};
use std::fmt;

/// Identifies the progress of one (destination, source) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    /// Domain the scanning handler is scoped to.
    pub destination: DomainId,
    /// Domain the state root message came from.
    pub source: DomainId,
}

impl CheckpointKey {
    pub fn new(destination: DomainId, source: DomainId) -> Self {
        Self {
            destination,
            source,
        }
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.destination, self.source)
    }
}

/// First block of the next scan.
///
/// A zero cursor means no checkpoint exists yet, so scanning starts at the
/// configured genesis block. Otherwise the checkpointed block itself is
/// scanned again: event handlers must tolerate that overlap.
#[must_use]
pub fn scan_start(cursor: BlockNumber, genesis_start: BlockNumber) -> BlockNumber {
    if cursor == 0 {
        genesis_start
    } else {
        cursor
    }
}
