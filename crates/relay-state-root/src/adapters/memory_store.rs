//! In-memory checkpoint store
//!
//! Volatile `BlockStorer` for tests and single-run deployments. Progress is
//! lost on restart, after which scanning resumes from the configured start.

use crate::domain::CheckpointKey;
use crate::error::StateRootResult;
use crate::ports::outbound::BlockStorer;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BlockNumber, DomainId};
use std::collections::HashMap;

/// Checkpoints keyed by (destination, source) pair.
#[derive(Debug, Default)]
pub struct InMemoryBlockStorer {
    checkpoints: RwLock<HashMap<CheckpointKey, BlockNumber>>,
}

impl InMemoryBlockStorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pairs with a checkpoint.
    pub fn len(&self) -> usize {
        self.checkpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.read().is_empty()
    }
}

#[async_trait]
impl BlockStorer for InMemoryBlockStorer {
    async fn latest_block(
        &self,
        destination: DomainId,
        source: DomainId,
    ) -> StateRootResult<BlockNumber> {
        Ok(self
            .checkpoints
            .read()
            .get(&CheckpointKey::new(destination, source))
            .copied()
            .unwrap_or(0))
    }

    async fn store_block(
        &self,
        destination: DomainId,
        source: DomainId,
        block: BlockNumber,
    ) -> StateRootResult<()> {
        self.checkpoints
            .write()
            .insert(CheckpointKey::new(destination, source), block);
        Ok(())
    }
}
