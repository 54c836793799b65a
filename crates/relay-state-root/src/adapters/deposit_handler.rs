//! # Deposit Event Handler
//!
//! Scans a block range of this domain for bridge deposits destined to the
//! domain that committed our state root, and publishes one transfer message
//! per deposit.
//!
//! Ranges are re-scanned after crashes and failed checkpoint writes, so
//! dispatched deposits are remembered in a bounded LRU set keyed by
//! `(destination, resource id, nonce)` and not published twice.

use crate::domain::BlockRange;
use crate::error::{StateRootError, StateRootResult};
use crate::ports::outbound::{DepositLogSource, EventHandler};
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use shared_bus::MessagePublisher;
use shared_types::{DepositLog, DomainId, Hash, Message, TransferData, U256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

type DepositKey = (DomainId, Hash, u64);

/// `EventHandler` turning deposits into transfer messages.
pub struct DepositEventHandler {
    domain_id: DomainId,
    source: Arc<dyn DepositLogSource>,
    publisher: Arc<dyn MessagePublisher>,
    block_range_limit: u64,
    dispatched: Mutex<LruCache<DepositKey, ()>>,
}

impl DepositEventHandler {
    /// Create a handler for deposits on `domain_id`.
    pub fn new(
        domain_id: DomainId,
        source: Arc<dyn DepositLogSource>,
        publisher: Arc<dyn MessagePublisher>,
        block_range_limit: u64,
        dedup_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(dedup_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            domain_id,
            source,
            publisher,
            block_range_limit,
            dispatched: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Correlation id of the transfer for `log`, stable across re-scans.
    pub fn transfer_id(&self, log: &DepositLog) -> String {
        let deposit = &log.deposit;
        format!(
            "{}-{}-{}-{}",
            self.domain_id,
            deposit.destination_domain_id,
            hex::encode(deposit.resource_id),
            deposit.deposit_nonce
        )
    }

    /// Number of remembered dispatched deposits.
    pub fn dispatched_count(&self) -> usize {
        self.dispatched.lock().len()
    }

    async fn dispatch(&self, log: DepositLog, slot: U256) -> StateRootResult<bool> {
        let key = log.deposit.dedup_key();
        if self.dispatched.lock().get(&key).is_some() {
            trace!(
                destination = key.0,
                nonce = key.2,
                "Deposit already dispatched, skipping"
            );
            return Ok(false);
        }

        let id = self.transfer_id(&log);
        let destination = log.deposit.destination_domain_id;
        let nonce = log.deposit.deposit_nonce;
        let message = Message::transfer(
            self.domain_id,
            destination,
            TransferData {
                block_number: log.block_number,
                deposit: log.deposit,
                slot,
            },
            id.clone(),
        );

        let receivers = self.publisher.publish(message).await;
        if receivers == 0 {
            warn!(
                source = self.domain_id,
                destination,
                message_id = %id,
                "No subscriber for transfer message"
            );
            return Err(StateRootError::Scan {
                handler: self.name().to_string(),
                reason: format!("transfer {id} reached no subscriber"),
            });
        }

        self.dispatched.lock().put(key, ());
        debug!(
            source = self.domain_id,
            destination,
            message_id = %id,
            nonce,
            "Dispatched transfer message"
        );
        Ok(true)
    }
}

#[async_trait]
impl EventHandler for DepositEventHandler {
    fn name(&self) -> &str {
        "deposit"
    }

    async fn handle_events(
        &self,
        destination: DomainId,
        range: BlockRange,
        slot: U256,
    ) -> StateRootResult<()> {
        if !range.has_new_blocks() {
            debug!(source = self.domain_id, destination, %range, "No new blocks to scan");
            return Ok(());
        }

        let mut dispatched = 0usize;
        for chunk in range.chunks(self.block_range_limit) {
            let logs = self.source.fetch_deposits(chunk).await.map_err(|e| {
                StateRootError::Scan {
                    handler: self.name().to_string(),
                    reason: format!("fetching deposits in {chunk}: {e}"),
                }
            })?;

            for log in logs
                .into_iter()
                .filter(|l| l.deposit.destination_domain_id == destination)
            {
                if self.dispatch(log, slot).await? {
                    dispatched += 1;
                }
            }
        }

        if dispatched > 0 {
            info!(
                source = self.domain_id,
                destination,
                %range,
                dispatched,
                "Dispatched deposits"
            );
        }
        Ok(())
    }
}
