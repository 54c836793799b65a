//! Test utilities for the state-root relay.
//!
//! In-memory mocks of the outbound ports with failure injection, for
//! deterministic tests. Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use relay_state_root::test_utils::MockBlockFetcher;
//!
//! let fetcher = MockBlockFetcher::new().with_block(500, 150);
//! assert_eq!(fetcher.call_count(), 0);
//! ```

use crate::adapters::eth_client::EthLog;
use crate::domain::BlockRange;
use crate::error::{StateRootError, StateRootResult};
use crate::ports::outbound::{BlockFetcher, BlockStorer, DepositLogSource, EventHandler};
use async_trait::async_trait;
use ethers::types::{Bytes, H160, H256, U64};
use parking_lot::Mutex;
use shared_types::{
    Address, BlockNumber, Deposit, DepositLog, DomainId, Hash, Message, StateRootData,
    TransferData, U256,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Build a state root message for `slot`.
pub fn state_root_message(
    source: DomainId,
    destination: DomainId,
    slot: u64,
    id: &str,
) -> Message {
    Message::state_root(
        source,
        destination,
        StateRootData {
            state_root: [0xAA; 32],
            slot: U256::from(slot),
        },
        id,
    )
}

/// Build a transfer message carrying a fixed deposit.
pub fn transfer_message(source: DomainId, destination: DomainId, id: &str) -> Message {
    Message::transfer(
        source,
        destination,
        TransferData {
            deposit: sample_deposit(destination, 1),
            slot: U256::from(1u64),
            block_number: 1,
        },
        id,
    )
}

/// A confirmed contract log with `topic` as `topic0`, emitted at
/// (`block`, `index`). The transaction hash is derived from both.
pub fn contract_log(address: Address, topic: Hash, data: Vec<u8>, block: u64, index: u64) -> EthLog {
    EthLog {
        address: H160::from(address),
        topics: vec![H256::from(topic)],
        data: Bytes::from(data),
        block_number: Some(U64::from(block)),
        transaction_hash: Some(H256::from_low_u64_be(block << 16 | index)),
        log_index: Some(index.into()),
        removed: Some(false),
        ..Default::default()
    }
}

/// A deposit to `destination` with the given nonce.
pub fn sample_deposit(destination: DomainId, nonce: u64) -> Deposit {
    Deposit {
        destination_domain_id: destination,
        security_model: 1,
        resource_id: [0x01; 32],
        deposit_nonce: nonce,
        sender_address: [0x02; 20],
        data: vec![0x03, 0x04],
    }
}

// =============================================================================
// BLOCK FETCHER
// =============================================================================

/// Block resolver backed by a slot → block table.
///
/// Unknown slots fail with `StateRootError::Resolution`.
#[derive(Default)]
pub struct MockBlockFetcher {
    blocks: Mutex<HashMap<U256, BlockNumber>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockBlockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(self, slot: u64, block: BlockNumber) -> Self {
        self.set_block(slot, block);
        self
    }

    pub fn set_block(&self, slot: u64, block: BlockNumber) {
        self.blocks.lock().insert(U256::from(slot), block);
    }

    /// Delay every lookup by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockFetcher for MockBlockFetcher {
    async fn execution_block_number(&self, slot: U256) -> StateRootResult<BlockNumber> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.blocks
            .lock()
            .get(&slot)
            .copied()
            .ok_or_else(|| StateRootError::Resolution {
                slot,
                reason: "slot not finalized".to_string(),
            })
    }
}

// =============================================================================
// BLOCK STORER
// =============================================================================

/// Checkpoint store with independently failing reads and writes.
#[derive(Default)]
pub struct MockBlockStorer {
    checkpoints: Mutex<HashMap<(DomainId, DomainId), BlockNumber>>,
    store_calls: Mutex<Vec<(DomainId, DomainId, BlockNumber)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockBlockStorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(
        self,
        destination: DomainId,
        source: DomainId,
        block: BlockNumber,
    ) -> Self {
        self.checkpoints.lock().insert((destination, source), block);
        self
    }

    /// Current checkpoint of the pair, `0` if none.
    pub fn checkpoint(&self, destination: DomainId, source: DomainId) -> BlockNumber {
        self.checkpoints
            .lock()
            .get(&(destination, source))
            .copied()
            .unwrap_or(0)
    }

    /// Every attempted write, failed ones included.
    pub fn store_calls(&self) -> Vec<(DomainId, DomainId, BlockNumber)> {
        self.store_calls.lock().clone()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlockStorer for MockBlockStorer {
    async fn latest_block(
        &self,
        destination: DomainId,
        source: DomainId,
    ) -> StateRootResult<BlockNumber> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StateRootError::Checkpoint {
                destination,
                source_domain: source,
                reason: "injected read failure".to_string(),
            });
        }
        Ok(self.checkpoint(destination, source))
    }

    async fn store_block(
        &self,
        destination: DomainId,
        source: DomainId,
        block: BlockNumber,
    ) -> StateRootResult<()> {
        self.store_calls.lock().push((destination, source, block));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StateRootError::Checkpoint {
                destination,
                source_domain: source,
                reason: "injected write failure".to_string(),
            });
        }
        self.checkpoints.lock().insert((destination, source), block);
        Ok(())
    }
}

// =============================================================================
// EVENT HANDLER
// =============================================================================

/// Event handler recording every invocation.
///
/// Also tracks how many invocations overlap in time, so tests can observe
/// whether two messages were ever processed at once.
pub struct RecordingEventHandler {
    name: String,
    calls: Mutex<Vec<(DomainId, BlockRange, U256)>>,
    delay: Mutex<Option<Duration>>,
    fail: AtomicBool,
    panic: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingEventHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            fail: AtomicBool::new(false),
            panic: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Recorded `(destination, range, slot)` triples, in call order.
    pub fn calls(&self) -> Vec<(DomainId, BlockRange, U256)> {
        self.calls.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_panic(&self, panic: bool) {
        self.panic.store(panic, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Highest number of overlapping invocations seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for RecordingEventHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_events(
        &self,
        destination: DomainId,
        range: BlockRange,
        slot: U256,
    ) -> StateRootResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().push((destination, range, slot));

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic.load(Ordering::SeqCst) {
            panic!("{} exploded", self.name);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StateRootError::Scan {
                handler: self.name.clone(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// DEPOSIT LOG SOURCE
// =============================================================================

/// Deposit source serving a fixed set of logs filtered by range.
#[derive(Default)]
pub struct MockDepositSource {
    logs: Mutex<Vec<DepositLog>>,
    queries: Mutex<Vec<BlockRange>>,
    fail: AtomicBool,
}

impl MockDepositSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deposit(self, block_number: BlockNumber, deposit: Deposit) -> Self {
        self.logs.lock().push(DepositLog {
            block_number,
            deposit,
        });
        self
    }

    /// Every queried range, in order.
    pub fn queries(&self) -> Vec<BlockRange> {
        self.queries.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DepositLogSource for MockDepositSource {
    async fn fetch_deposits(&self, range: BlockRange) -> StateRootResult<Vec<DepositLog>> {
        self.queries.lock().push(range);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StateRootError::Rpc("injected log query failure".to_string()));
        }
        Ok(self
            .logs
            .lock()
            .iter()
            .filter(|log| log.block_number >= range.start && log.block_number <= range.end)
            .cloned()
            .collect())
    }
}
