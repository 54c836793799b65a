//! Transfer message sink
//!
//! Terminal consumer of transfer messages. Proving and executing transfers on
//! the destination chain happens elsewhere; this sink records what would be
//! handed over.

use shared_bus::Subscription;
use shared_types::{Message, MessagePayload};
use tokio::sync::watch;
use tracing::{debug, info};

/// Logs every transfer message it receives.
#[derive(Debug, Default)]
pub struct TransferSink {
    received: u64,
}

impl TransferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Record one message.
    pub fn accept(&mut self, message: &Message) {
        match &message.payload {
            MessagePayload::Transfer(data) => {
                self.received += 1;
                info!(
                    source = message.source,
                    destination = message.destination,
                    message_id = %message.id,
                    nonce = data.deposit.deposit_nonce,
                    block = data.block_number,
                    slot = %data.slot,
                    "Transfer ready for proving"
                );
            }
            MessagePayload::StateRoot(_) => {
                debug!(message_id = %message.id, "Ignoring non-transfer message");
            }
        }
    }

    /// Consume `subscription` until shutdown, returning the final count.
    pub async fn run(
        mut self,
        mut subscription: Subscription,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        loop {
            tokio::select! {
                message = subscription.recv() => match message {
                    Some(message) => self.accept(&message),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(received = self.received, "Transfer sink stopped");
        self.received
    }
}
