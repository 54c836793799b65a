//! # State Root Listener
//!
//! Polls one domain's execution node for `StateRootSubmitted` events and
//! publishes each as a state root message. A commitment observed on domain
//! `L` about domain `D` becomes `Message { source: L, destination: D }`: the
//! worker of `D` then scans `D` for deposits provable on `L`.
//!
//! Progress is checkpointed in the shared `BlockStorer` under the pair
//! `(L, L)`, which state root messages never use since a domain does not
//! commit its own state root.

use async_trait::async_trait;
use relay_state_root::adapters::eth_client::{is_live_event, log_block, EthClient, EthLog};
use relay_state_root::{BlockRange, BlockStorer, StateRootError, StateRootResult};
use shared_bus::MessagePublisher;
use shared_types::{
    Address, BlockNumber, DomainId, Message, StateRootData, StateRootSubmitted,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Chain access needed by the listener.
#[async_trait]
pub trait StateRootLogReader: Send + Sync {
    /// Current chain head.
    async fn head(&self) -> StateRootResult<BlockNumber>;

    /// `StateRootSubmitted` logs emitted in `range`.
    async fn state_root_logs(&self, range: BlockRange) -> StateRootResult<Vec<EthLog>>;
}

/// `StateRootLogReader` over the execution node's JSON-RPC.
pub struct EthStateRootReader {
    client: Arc<EthClient>,
    addresses: Vec<Address>,
}

impl EthStateRootReader {
    pub fn new(client: Arc<EthClient>, addresses: Vec<Address>) -> Self {
        Self { client, addresses }
    }
}

#[async_trait]
impl StateRootLogReader for EthStateRootReader {
    async fn head(&self) -> StateRootResult<BlockNumber> {
        self.client.block_number().await
    }

    async fn state_root_logs(&self, range: BlockRange) -> StateRootResult<Vec<EthLog>> {
        if self.addresses.is_empty() || range.is_inverted() {
            return Ok(Vec::new());
        }
        self.client
            .get_logs(range, &self.addresses, StateRootSubmitted::topic())
            .await
    }
}

/// Where a listener starts when it first polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStart {
    /// Start used without stored progress, or with `fresh_start`.
    pub start_block: BlockNumber,
    /// Ignore stored progress.
    pub fresh_start: bool,
    /// Start at the confirmed chain head.
    pub latest: bool,
}

/// Listener settings.
#[derive(Debug, Clone, Copy)]
pub struct ListenerConfig {
    pub domain_id: DomainId,
    pub start: ListenerStart,
    pub block_confirmations: u64,
    pub block_interval: Duration,
    pub block_retry_interval: Duration,
    pub block_range_limit: u64,
}

/// Polls for state root commitments on one domain.
pub struct StateRootListener {
    config: ListenerConfig,
    reader: Arc<dyn StateRootLogReader>,
    publisher: Arc<dyn MessagePublisher>,
    progress: Arc<dyn BlockStorer>,
    next_block: Option<BlockNumber>,
}

impl StateRootListener {
    pub fn new(
        config: ListenerConfig,
        reader: Arc<dyn StateRootLogReader>,
        publisher: Arc<dyn MessagePublisher>,
        progress: Arc<dyn BlockStorer>,
    ) -> Self {
        Self {
            config,
            reader,
            publisher,
            progress,
            next_block: None,
        }
    }

    /// Next block to be scanned, once known.
    pub fn next_block(&self) -> Option<BlockNumber> {
        self.next_block
    }

    async fn initial_block(&self, safe_head: BlockNumber) -> StateRootResult<BlockNumber> {
        let start = self.config.start;
        if start.latest {
            return Ok(safe_head);
        }
        if start.fresh_start {
            return Ok(start.start_block);
        }
        let domain = self.config.domain_id;
        let stored = self.progress.latest_block(domain, domain).await?;
        Ok(if stored == 0 {
            start.start_block
        } else {
            stored + 1
        })
    }

    /// Scan everything confirmed since the last poll.
    ///
    /// Returns the number of published messages.
    pub async fn poll_once(&mut self) -> StateRootResult<usize> {
        let domain = self.config.domain_id;
        let head = self.reader.head().await?;
        let safe_head = head.saturating_sub(self.config.block_confirmations);

        let next = match self.next_block {
            Some(next) => next,
            None => {
                let next = self.initial_block(safe_head).await?;
                info!(domain, next, "State root listener starting");
                self.next_block = Some(next);
                next
            }
        };
        if next > safe_head {
            return Ok(0);
        }

        let mut published = 0;
        for chunk in BlockRange::new(next, safe_head).chunks(self.config.block_range_limit) {
            let logs = self.reader.state_root_logs(chunk).await?;
            let topic = StateRootSubmitted::topic();

            for log in logs.iter().filter(|l| is_live_event(l, &topic)) {
                let message = match decode_state_root_log(domain, log) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(domain, error = %e, tx = ?log.transaction_hash, "Skipping malformed state root log");
                        continue;
                    }
                };
                if message.destination == domain {
                    warn!(domain, message_id = %message.id, "Ignoring state root of own domain");
                    continue;
                }

                let destination = message.destination;
                let id = message.id.clone();
                if self.publisher.publish(message).await == 0 {
                    return Err(StateRootError::WorkerUnavailable {
                        domain: destination,
                    });
                }
                debug!(source = domain, destination, message_id = %id, "Published state root message");
                published += 1;
            }

            self.next_block = Some(chunk.end.saturating_add(1));
            if let Err(e) = self.progress.store_block(domain, domain, chunk.end).await {
                warn!(domain, block = chunk.end, error = %e, "Failed saving listener progress");
            }
        }

        Ok(published)
    }

    /// Poll until `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let domain = self.config.domain_id;
        info!(domain, "State root listener started");

        loop {
            let delay = match self.poll_once().await {
                Ok(published) => {
                    if published > 0 {
                        info!(domain, published, "Published state root messages");
                    }
                    self.config.block_interval
                }
                Err(e) => {
                    warn!(domain, error = %e, "State root poll failed, retrying");
                    self.config.block_retry_interval
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(domain, "State root listener stopped");
    }
}

/// Build the state root message for a `StateRootSubmitted` log seen on
/// `domain`.
pub fn decode_state_root_log(domain: DomainId, log: &EthLog) -> StateRootResult<Message> {
    let block = log_block(log)?;
    let event = StateRootSubmitted::from_log_data(&log.data)?;

    let id = match (&log.transaction_hash, &log.log_index) {
        (Some(tx), Some(index)) => format!("{tx:?}-{index}"),
        _ => format!("{domain}-{block}-{}", event.slot),
    };

    Ok(Message::state_root(
        domain,
        event.source_domain_id,
        StateRootData {
            state_root: event.state_root,
            slot: event.slot,
        },
        id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use relay_state_root::test_utils::contract_log;
    use relay_state_root::InMemoryBlockStorer;
    use shared_bus::{InMemoryMessageBus, MessageFilter};
    use shared_types::{MessagePayload, U256};

    #[derive(Default)]
    struct MockReader {
        head: Mutex<BlockNumber>,
        logs: Mutex<Vec<EthLog>>,
        queries: Mutex<Vec<BlockRange>>,
    }

    #[async_trait]
    impl StateRootLogReader for MockReader {
        async fn head(&self) -> StateRootResult<BlockNumber> {
            Ok(*self.head.lock())
        }

        async fn state_root_logs(&self, range: BlockRange) -> StateRootResult<Vec<EthLog>> {
            self.queries.lock().push(range);
            Ok(self
                .logs
                .lock()
                .iter()
                .filter(|l| {
                    let block = log_block(l).unwrap();
                    block >= range.start && block <= range.end
                })
                .cloned()
                .collect())
        }
    }

    fn log(block: u64, source_domain_id: DomainId, slot: u64, index: u64) -> EthLog {
        let event = StateRootSubmitted {
            source_domain_id,
            slot: U256::from(slot),
            state_root: [0x5A; 32],
        };
        contract_log(
            [0x01; 20],
            StateRootSubmitted::topic(),
            event.to_log_data(),
            block,
            index,
        )
    }

    fn config(start: ListenerStart) -> ListenerConfig {
        ListenerConfig {
            domain_id: 2,
            start,
            block_confirmations: 1,
            block_interval: Duration::from_secs(5),
            block_retry_interval: Duration::from_secs(5),
            block_range_limit: 10,
        }
    }

    fn default_start() -> ListenerStart {
        ListenerStart {
            start_block: 100,
            fresh_start: false,
            latest: false,
        }
    }

    #[test]
    fn test_decode_state_root_log() {
        let message = decode_state_root_log(2, &log(105, 1, 500, 3)).unwrap();
        assert_eq!(message.source, 2);
        assert_eq!(message.destination, 1);
        assert_eq!(message.id, format!("0x{:064x}-3", (105u64 << 16) | 3));
        match message.payload {
            MessagePayload::StateRoot(data) => {
                assert_eq!(data.slot, U256::from(500u64));
                assert_eq!(data.state_root, [0x5A; 32]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_decode_without_tx_position_uses_block_and_slot() {
        let mut entry = log(105, 1, 500, 3);
        entry.transaction_hash = None;
        let message = decode_state_root_log(2, &entry).unwrap();
        assert_eq!(message.id, "2-105-500");
    }

    #[tokio::test]
    async fn test_malformed_log_skipped() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 110;
        reader.logs.lock().push(contract_log(
            [0x01; 20],
            StateRootSubmitted::topic(),
            vec![0u8; 40],
            104,
            0,
        ));
        reader.logs.lock().push(log(105, 1, 500, 0));
        let bus = Arc::new(InMemoryMessageBus::new());
        let mut sub = bus.subscribe(MessageFilter::all());
        let progress = Arc::new(InMemoryBlockStorer::new());
        let mut listener = StateRootListener::new(config(default_start()), reader, bus, progress);

        assert_eq!(listener.poll_once().await.unwrap(), 1);
        assert_eq!(sub.try_recv().unwrap().unwrap().destination, 1);
    }

    #[tokio::test]
    async fn test_polls_confirmed_range_in_chunks() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 125;
        reader.logs.lock().push(log(105, 1, 500, 0));
        reader.logs.lock().push(log(126, 1, 600, 0));
        let bus = Arc::new(InMemoryMessageBus::new());
        let mut sub = bus.subscribe(MessageFilter::all());
        let progress = Arc::new(InMemoryBlockStorer::new());
        let mut listener =
            StateRootListener::new(config(default_start()), reader.clone(), bus, progress.clone());

        assert_eq!(listener.poll_once().await.unwrap(), 1);

        assert_eq!(
            *reader.queries.lock(),
            vec![
                BlockRange::new(100, 109),
                BlockRange::new(110, 119),
                BlockRange::new(120, 124),
            ]
        );
        assert_eq!(sub.try_recv().unwrap().unwrap().destination, 1);
        assert_eq!(listener.next_block(), Some(125));
        assert_eq!(progress.latest_block(2, 2).await.unwrap(), 124);
    }

    #[tokio::test]
    async fn test_nothing_new_until_head_moves() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 125;
        let bus = Arc::new(InMemoryMessageBus::new());
        let progress = Arc::new(InMemoryBlockStorer::new());
        let mut listener =
            StateRootListener::new(config(default_start()), reader.clone(), bus, progress);

        listener.poll_once().await.unwrap();
        let queries = reader.queries.lock().len();
        listener.poll_once().await.unwrap();
        assert_eq!(reader.queries.lock().len(), queries);
    }

    #[tokio::test]
    async fn test_resumes_after_stored_progress() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 301;
        let bus = Arc::new(InMemoryMessageBus::new());
        let progress = Arc::new(InMemoryBlockStorer::new());
        progress.store_block(2, 2, 250).await.unwrap();
        let mut listener =
            StateRootListener::new(config(default_start()), reader.clone(), bus, progress);

        listener.poll_once().await.unwrap();
        assert_eq!(reader.queries.lock()[0].start, 251);
    }

    #[tokio::test]
    async fn test_fresh_start_ignores_progress() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 301;
        let bus = Arc::new(InMemoryMessageBus::new());
        let progress = Arc::new(InMemoryBlockStorer::new());
        progress.store_block(2, 2, 250).await.unwrap();
        let start = ListenerStart {
            fresh_start: true,
            ..default_start()
        };
        let mut listener = StateRootListener::new(config(start), reader.clone(), bus, progress);

        listener.poll_once().await.unwrap();
        assert_eq!(reader.queries.lock()[0].start, 100);
    }

    #[tokio::test]
    async fn test_latest_starts_at_head() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 301;
        let bus = Arc::new(InMemoryMessageBus::new());
        let progress = Arc::new(InMemoryBlockStorer::new());
        let start = ListenerStart {
            latest: true,
            ..default_start()
        };
        let mut listener = StateRootListener::new(config(start), reader.clone(), bus, progress);

        listener.poll_once().await.unwrap();
        assert_eq!(*reader.queries.lock(), vec![BlockRange::new(300, 300)]);
    }

    #[tokio::test]
    async fn test_own_domain_commitment_ignored() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 110;
        reader.logs.lock().push(log(105, 2, 500, 0));
        let bus = Arc::new(InMemoryMessageBus::new());
        let _sub = bus.subscribe(MessageFilter::all());
        let progress = Arc::new(InMemoryBlockStorer::new());
        let mut listener = StateRootListener::new(config(default_start()), reader, bus, progress);

        assert_eq!(listener.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unrouted_message_is_retried() {
        let reader = Arc::new(MockReader::default());
        *reader.head.lock() = 110;
        reader.logs.lock().push(log(105, 1, 500, 0));
        let bus = Arc::new(InMemoryMessageBus::new());
        let progress = Arc::new(InMemoryBlockStorer::new());
        let mut listener =
            StateRootListener::new(config(default_start()), reader, bus.clone(), progress);

        assert!(listener.poll_once().await.is_err());
        assert_eq!(listener.next_block(), Some(100));

        let _sub = bus.subscribe(MessageFilter::all());
        assert_eq!(listener.poll_once().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let reader = Arc::new(MockReader::default());
        let bus = Arc::new(InMemoryMessageBus::new());
        let progress = Arc::new(InMemoryBlockStorer::new());
        let listener = StateRootListener::new(config(default_start()), reader, bus, progress);
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(listener.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
