//! # Outbound Ports
//!
//! Traits for the collaborators the orchestrator calls out to. All of them
//! are shared across destination workers and must be safe for concurrent use.

use crate::domain::BlockRange;
use crate::error::StateRootResult;
use async_trait::async_trait;
use shared_types::{BlockNumber, DepositLog, DomainId, U256};

/// Block resolver - outbound port.
///
/// Pure lookup: no side effects, safe to call concurrently and to retry.
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    /// Execution block number committed at `slot`.
    ///
    /// Fails when the slot is unknown, not finalized, or the query fails.
    async fn execution_block_number(&self, slot: U256) -> StateRootResult<BlockNumber>;
}

/// Checkpoint store - outbound port.
#[async_trait]
pub trait BlockStorer: Send + Sync {
    /// Last checkpointed block for the pair, `0` when none exists yet.
    async fn latest_block(
        &self,
        destination: DomainId,
        source: DomainId,
    ) -> StateRootResult<BlockNumber>;

    /// Durably record `block` as the pair's checkpoint, overwriting any
    /// previous value.
    async fn store_block(
        &self,
        destination: DomainId,
        source: DomainId,
        block: BlockNumber,
    ) -> StateRootResult<()>;
}

/// Event handler - outbound port, fanned out in registration order.
///
/// Implementations must treat a range without new blocks as a no-op and must
/// tolerate being invoked again on an overlapping or identical range.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Scan `range` for this handler's event category and emit the resulting
    /// messages for `destination`.
    async fn handle_events(
        &self,
        destination: DomainId,
        range: BlockRange,
        slot: U256,
    ) -> StateRootResult<()>;
}

/// Deposit log source - outbound port of the chain listener.
#[async_trait]
pub trait DepositLogSource: Send + Sync {
    /// All deposits emitted in `range` (inclusive), in chain order.
    async fn fetch_deposits(&self, range: BlockRange) -> StateRootResult<Vec<DepositLog>>;
}
