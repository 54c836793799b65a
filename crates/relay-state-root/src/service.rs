//! State Root Handler - core orchestration
//!
//! Resolves a state root message to an execution block, scans the range
//! since the last checkpoint with every registered event handler, then
//! advances the checkpoint.
//!
//! ```text
//! StateRoot(slot) ──→ BlockFetcher ──→ end block
//!                     BlockStorer  ──→ cursor ──→ start block
//!                                          │
//!                     EventHandler[0..n] ←─┘  (in order, abort on first error)
//!                                          │
//!                     BlockStorer.store(end)  (failure logged, not propagated)
//! ```

use crate::config::StateRootConfig;
use crate::domain::{scan_start, BlockRange, CheckpointKey};
use crate::error::{StateRootError, StateRootResult};
use crate::ports::outbound::{BlockFetcher, BlockStorer, EventHandler};
use shared_types::{BlockNumber, DomainId, Message, MessageError, MessagePayload, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counters over the lifetime of one handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Messages that completed successfully.
    pub handled: u64,
    /// Messages that failed and were left unconsumed.
    pub failed: u64,
    /// Successful messages whose checkpoint write failed.
    pub checkpoint_write_failures: u64,
}

/// Orchestrator for one destination domain.
///
/// `handle_message` takes `&mut self`: a handler is owned by exactly one
/// worker, so no two messages for this destination are ever in flight.
pub struct StateRootHandler {
    domain_id: DomainId,
    start_block: BlockNumber,
    resolve_timeout: Duration,
    event_handlers: Vec<Arc<dyn EventHandler>>,
    block_fetcher: Arc<dyn BlockFetcher>,
    block_storer: Arc<dyn BlockStorer>,
    stats: HandlerStats,
}

impl StateRootHandler {
    /// Create a handler. `event_handlers` run in the given order.
    pub fn new(
        config: &StateRootConfig,
        event_handlers: Vec<Arc<dyn EventHandler>>,
        block_fetcher: Arc<dyn BlockFetcher>,
        block_storer: Arc<dyn BlockStorer>,
    ) -> Self {
        Self {
            domain_id: config.domain_id,
            start_block: config.start_block,
            resolve_timeout: config.resolve_timeout,
            event_handlers,
            block_fetcher,
            block_storer,
            stats: HandlerStats::default(),
        }
    }

    pub fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    pub fn stats(&self) -> HandlerStats {
        self.stats
    }

    /// Handle one state root message.
    ///
    /// Returns `Ok(())` once every event handler succeeded, even if the
    /// checkpoint write afterwards failed.
    pub async fn handle_message(&mut self, message: &Message) -> StateRootResult<()> {
        let result = self.process(message).await;
        match &result {
            Ok(()) => self.stats.handled += 1,
            Err(_) => self.stats.failed += 1,
        }
        result
    }

    async fn process(&mut self, message: &Message) -> StateRootResult<()> {
        let data = match &message.payload {
            MessagePayload::StateRoot(data) => data,
            MessagePayload::Transfer(_) => {
                return Err(MessageError::UnexpectedPayload {
                    expected: "EVMStateRootMessage",
                    actual: message.message_type().as_str(),
                }
                .into())
            }
        };
        let key = CheckpointKey::new(self.domain_id, message.source);

        debug!(
            destination = self.domain_id,
            source = message.source,
            message_id = %message.id,
            state_root = %hex::encode(data.state_root),
            slot = %data.slot,
            "Received state root message from domain {}",
            message.source
        );

        let end_block = self.resolve(data.slot).await?;
        let cursor = self
            .block_storer
            .latest_block(key.destination, key.source)
            .await?;
        let range = BlockRange::new(scan_start(cursor, self.start_block), end_block);

        debug!(
            destination = self.domain_id,
            source = message.source,
            message_id = %message.id,
            cursor,
            %range,
            "Scanning block range"
        );

        for handler in &self.event_handlers {
            if let Err(e) = handler
                .handle_events(message.source, range, data.slot)
                .await
            {
                warn!(
                    destination = self.domain_id,
                    source = message.source,
                    message_id = %message.id,
                    handler = handler.name(),
                    %range,
                    error = %e,
                    "Event handler failed, checkpoint not advanced"
                );
                return Err(e);
            }
        }

        if !range.has_new_blocks() {
            debug!(
                destination = self.domain_id,
                source = message.source,
                message_id = %message.id,
                %range,
                "No new blocks since checkpoint {}",
                key
            );
            return Ok(());
        }

        match self
            .block_storer
            .store_block(key.destination, key.source, end_block)
            .await
        {
            Ok(()) => info!(
                destination = self.domain_id,
                source = message.source,
                message_id = %message.id,
                block = end_block,
                "Checkpoint {} advanced",
                key
            ),
            Err(e) => {
                self.stats.checkpoint_write_failures += 1;
                error!(
                    destination = self.domain_id,
                    source = message.source,
                    message_id = %message.id,
                    block = end_block,
                    error = %e,
                    "Failed saving latest block for {}",
                    key
                );
            }
        }

        Ok(())
    }

    /// Resolve `slot` within the configured deadline.
    async fn resolve(&self, slot: U256) -> StateRootResult<BlockNumber> {
        match tokio::time::timeout(
            self.resolve_timeout,
            self.block_fetcher.execution_block_number(slot),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StateRootError::ResolutionTimeout {
                slot,
                timeout: self.resolve_timeout,
            }),
        }
    }
}
