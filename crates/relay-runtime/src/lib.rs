//! # Relayer Runtime
//!
//! Wires the state-root relay for every configured domain.
//!
//! ## Per-Domain Wiring
//!
//! ```text
//! execution node ──StateRootSubmitted──→ StateRootListener ──StateRoot──→ Bus
//!                                                                          │
//!                    MessageRouter ←───────────────────────────────────────┘
//!                         │ (by destination)
//!                         ↓
//!                StateRootWorker(D) ── BeaconBlockFetcher(D)
//!                         │         ── BlockStorer (shared)
//!                         │         ── DepositEventHandler(D) ──Transfer──→ Bus ──→ TransferSink
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Open the checkpoint store
//! 3. Spawn one worker per domain and register it with the router
//! 4. Subscribe router and sink to the bus
//! 5. Start the listeners
//!
//! Shutdown flips a `watch` channel observed by listeners, router and sink;
//! workers stop once the router has dropped their mailboxes.

pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod router;
pub mod sink;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use relay_state_root::{
    BeaconBlockFetcher, BlockStorer, DepositEventHandler, EthClient, EthDepositSource,
    EventHandler, HandlerStats, StateRootHandler, StateRootWorker,
};
use shared_bus::{InMemoryMessageBus, MessageFilter};
use shared_types::MessageType;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use config::{DomainConfig, RelayerConfig, StorageBackend};
pub use error::{RuntimeError, RuntimeResult};
pub use listener::{EthStateRootReader, ListenerConfig, ListenerStart, StateRootListener};
pub use router::MessageRouter;
pub use sink::TransferSink;

/// Time allowed for tasks to finish after the shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The relayer process.
pub struct RelayerRuntime {
    config: RelayerConfig,
    bus: Arc<InMemoryMessageBus>,
    storer: Arc<dyn BlockStorer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
    workers: Vec<JoinHandle<HandlerStats>>,
}

impl RelayerRuntime {
    /// Create a runtime, opening the configured checkpoint store.
    pub fn new(config: RelayerConfig) -> RuntimeResult<Self> {
        let storer = storage::open_block_storer(&config)?;
        Ok(Self::with_storer(config, storer))
    }

    /// Create a runtime around an already opened checkpoint store.
    pub fn with_storer(config: RelayerConfig, storer: Arc<dyn BlockStorer>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            bus: Arc::new(InMemoryMessageBus::new()),
            storer,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
            workers: Vec::new(),
        }
    }

    pub fn bus(&self) -> Arc<InMemoryMessageBus> {
        Arc::clone(&self.bus)
    }

    /// Spawn workers, router, sink and listeners.
    pub fn start(&mut self) -> RuntimeResult<()> {
        let mut router = MessageRouter::new();
        let mut listeners = Vec::with_capacity(self.config.domains.len());

        for domain in &self.config.domains {
            let domain_id = domain.domain_id();
            let client = Arc::new(EthClient::new(&domain.execution_endpoint)?);

            let deposits = DepositEventHandler::new(
                domain_id,
                Arc::new(EthDepositSource::new(client.clone(), domain.bridge_address)),
                self.bus.clone(),
                domain.state_root.block_range_limit,
                domain.state_root.dedup_capacity,
            );
            let fetcher =
                BeaconBlockFetcher::new(&domain.beacon_endpoint, domain.state_root.resolve_timeout)?;
            let handler = StateRootHandler::new(
                &domain.state_root,
                vec![Arc::new(deposits) as Arc<dyn EventHandler>],
                Arc::new(fetcher),
                self.storer.clone(),
            );
            let (mailbox, worker) =
                StateRootWorker::spawn(handler, domain.state_root.mailbox_capacity);
            router.register(Arc::new(mailbox));
            self.workers.push(worker);

            listeners.push(StateRootListener::new(
                listener_config(domain),
                Arc::new(EthStateRootReader::new(
                    client,
                    domain.state_root_addresses.clone(),
                )),
                self.bus.clone(),
                self.storer.clone(),
            ));

            info!(
                domain = domain_id,
                execution = %domain.execution_endpoint,
                beacon = %domain.beacon_endpoint,
                start_block = domain.state_root.start_block,
                "Domain configured"
            );
        }

        let state_roots = self
            .bus
            .subscribe(MessageFilter::types(vec![MessageType::StateRoot]));
        let transfers = self
            .bus
            .subscribe(MessageFilter::types(vec![MessageType::Transfer]));

        self.tasks
            .push(tokio::spawn(router.run(state_roots, self.shutdown_rx.clone())));
        let shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            TransferSink::new().run(transfers, shutdown).await;
        }));
        for listener in listeners {
            self.tasks
                .push(tokio::spawn(listener.run(self.shutdown_rx.clone())));
        }

        info!(domains = self.config.domains.len(), "Relayer started");
        Ok(())
    }

    /// Signal shutdown and wait for every task to finish.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks = self.tasks;
        let workers = self.workers;
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async move {
            for task in tasks {
                let _ = task.await;
            }
            for worker in workers {
                match worker.await {
                    Ok(stats) => info!(
                        handled = stats.handled,
                        failed = stats.failed,
                        checkpoint_write_failures = stats.checkpoint_write_failures,
                        "Worker drained"
                    ),
                    Err(e) => warn!(error = %e, "Worker task failed"),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Shutdown grace period elapsed with tasks still running");
        }
        info!("Shutdown complete");
    }
}

fn listener_config(domain: &DomainConfig) -> ListenerConfig {
    ListenerConfig {
        domain_id: domain.domain_id(),
        start: ListenerStart {
            start_block: domain.state_root.start_block,
            fresh_start: domain.fresh_start,
            latest: domain.latest,
        },
        block_confirmations: domain.block_confirmations,
        block_interval: domain.block_interval,
        block_retry_interval: domain.block_retry_interval,
        block_range_limit: domain.state_root.block_range_limit,
    }
}
