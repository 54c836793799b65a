//! # Message Router
//!
//! Delivers state root messages from the bus to the worker of their
//! destination domain.
//!
//! Every destination has its own lane drained by one forwarding task, so
//! messages reach a worker in bus order while a slow destination never holds
//! up the others.

use relay_state_root::{StateRootApi, StateRootError, StateRootResult};
use shared_bus::Subscription;
use shared_types::{DomainId, Message, MessagePayload};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Routes state root messages to per-destination handlers.
#[derive(Clone, Default)]
pub struct MessageRouter {
    workers: HashMap<DomainId, Arc<dyn StateRootApi>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler of one destination, replacing any previous one.
    pub fn register(&mut self, worker: Arc<dyn StateRootApi>) {
        self.workers.insert(worker.domain_id(), worker);
    }

    /// Registered destinations, sorted.
    pub fn destinations(&self) -> Vec<DomainId> {
        let mut ids: Vec<_> = self.workers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Hand `message` to its destination's worker and wait for the outcome.
    pub async fn route(&self, message: Message) -> StateRootResult<()> {
        if !is_routed(&message) {
            return Ok(());
        }
        let worker = self
            .workers
            .get(&message.destination)
            .cloned()
            .ok_or(StateRootError::WorkerUnavailable {
                domain: message.destination,
            })?;
        worker.handle_message(message).await
    }

    /// Route everything `subscription` delivers until shutdown.
    ///
    /// On exit the lanes are closed and messages already queued on them are
    /// still handed to their workers.
    pub async fn run(self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        info!(destinations = ?self.destinations(), "Message router started");

        let mut lanes = HashMap::with_capacity(self.workers.len());
        let mut forwarders: Vec<JoinHandle<()>> = Vec::with_capacity(self.workers.len());
        for (domain, worker) in self.workers {
            let (lane, queued) = mpsc::unbounded_channel();
            lanes.insert(domain, lane);
            forwarders.push(tokio::spawn(forward(worker, queued)));
        }

        loop {
            let message = tokio::select! {
                message = subscription.recv() => match message {
                    Some(message) => message,
                    None => {
                        info!("Message bus closed, router exiting");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            if !is_routed(&message) {
                continue;
            }
            let destination = message.destination;
            match lanes.get(&destination) {
                Some(lane) => {
                    if let Err(mpsc::error::SendError(message)) = lane.send(message) {
                        warn!(destination, message_id = %message.id, "Destination lane closed");
                    }
                }
                None => warn!(
                    source = message.source,
                    destination,
                    message_id = %message.id,
                    error = %StateRootError::WorkerUnavailable { domain: destination },
                    "State root message dropped"
                ),
            }
        }

        drop(lanes);
        for forwarder in forwarders {
            if let Err(e) = forwarder.await {
                warn!(error = %e, "Router lane task failed");
            }
        }
        info!("Message router stopped");
    }
}

fn is_routed(message: &Message) -> bool {
    match &message.payload {
        MessagePayload::StateRoot(_) => true,
        MessagePayload::Transfer(_) => {
            debug!(message_id = %message.id, "Transfer messages are not routed to workers");
            false
        }
    }
}

/// Hand queued messages to `worker` one at a time.
async fn forward(worker: Arc<dyn StateRootApi>, mut queued: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = queued.recv().await {
        let source = message.source;
        let destination = message.destination;
        let id = message.id.clone();
        match worker.handle_message(message).await {
            Ok(()) => debug!(source, destination, message_id = %id, "State root message handled"),
            Err(e) => warn!(
                source,
                destination,
                message_id = %id,
                error = %e,
                retryable = e.is_retryable(),
                "State root message failed"
            ),
        }
    }
}
