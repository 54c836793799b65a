//! # Destination Worker
//!
//! Runs one `StateRootHandler` on its own task and feeds it from an mpsc
//! mailbox. Messages for the same destination are therefore processed one
//! at a time, in arrival order, while different destinations run in
//! parallel on separate workers.
//!
//! A panic inside the handler is caught, reported to the submitter as
//! `StateRootError::Panicked`, and the worker keeps serving its mailbox.

use crate::error::{StateRootError, StateRootResult};
use crate::ports::inbound::StateRootApi;
use crate::service::{HandlerStats, StateRootHandler};
use async_trait::async_trait;
use futures::FutureExt;
use shared_types::{DomainId, Message};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};

/// Work item sent to a worker.
struct Job {
    message: Message,
    reply: oneshot::Sender<StateRootResult<()>>,
}

/// Cloneable handle for submitting messages to one destination worker.
#[derive(Clone)]
pub struct StateRootMailbox {
    domain_id: DomainId,
    sender: mpsc::Sender<Job>,
}

impl StateRootMailbox {
    /// Queue `message` and wait for its outcome.
    ///
    /// Waits for mailbox space when the worker is backed up.
    pub async fn submit(&self, message: Message) -> StateRootResult<()> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .send(Job { message, reply })
            .await
            .map_err(|_| StateRootError::WorkerUnavailable {
                domain: self.domain_id,
            })?;

        outcome.await.map_err(|_| StateRootError::WorkerUnavailable {
            domain: self.domain_id,
        })?
    }

    /// Whether the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl StateRootApi for StateRootMailbox {
    fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    async fn handle_message(&self, message: Message) -> StateRootResult<()> {
        self.submit(message).await
    }
}

/// Owns a handler and drains its mailbox.
pub struct StateRootWorker {
    handler: StateRootHandler,
    receiver: mpsc::Receiver<Job>,
}

impl StateRootWorker {
    /// Create a worker and the mailbox feeding it.
    pub fn new(handler: StateRootHandler, capacity: usize) -> (Self, StateRootMailbox) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let mailbox = StateRootMailbox {
            domain_id: handler.domain_id(),
            sender,
        };
        (Self { handler, receiver }, mailbox)
    }

    /// Create a worker and run it on a new task.
    ///
    /// The task ends once every mailbox clone has been dropped and yields
    /// the handler's final stats.
    pub fn spawn(
        handler: StateRootHandler,
        capacity: usize,
    ) -> (StateRootMailbox, JoinHandle<HandlerStats>) {
        let (worker, mailbox) = Self::new(handler, capacity);
        (mailbox, tokio::spawn(worker.run()))
    }

    /// Process jobs until the mailbox closes.
    pub async fn run(mut self) -> HandlerStats {
        let destination = self.handler.domain_id();
        info!(destination, "State root worker started");

        while let Some(Job { message, reply }) = self.receiver.recv().await {
            let span = info_span!(
                "state_root",
                destination,
                source = message.source,
                message_id = %message.id,
            );

            let outcome = AssertUnwindSafe(self.handler.handle_message(&message))
                .catch_unwind()
                .instrument(span)
                .await;

            let result = match outcome {
                Ok(result) => result,
                Err(panic) => {
                    let reason = panic_reason(panic.as_ref());
                    error!(
                        destination,
                        source = message.source,
                        message_id = %message.id,
                        %reason,
                        "State root handling panicked"
                    );
                    Err(StateRootError::Panicked {
                        destination,
                        reason,
                    })
                }
            };

            if reply.send(result).is_err() {
                debug!(
                    destination,
                    message_id = %message.id,
                    "Submitter went away before the result was ready"
                );
            }
        }

        let stats = self.handler.stats();
        info!(
            destination,
            handled = stats.handled,
            failed = stats.failed,
            "State root worker stopped"
        );
        stats
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
