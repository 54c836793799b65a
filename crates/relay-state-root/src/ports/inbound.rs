//! # Inbound Ports
//!
//! What the state-root relay offers to the message delivery layer.

use crate::error::StateRootResult;
use async_trait::async_trait;
use shared_types::{DomainId, Message};

/// State root message handling - inbound port.
///
/// Success means the message is consumed. Any error means it is not, and
/// re-delivery is the caller's decision.
#[async_trait]
pub trait StateRootApi: Send + Sync {
    /// Destination domain this handler is scoped to.
    fn domain_id(&self) -> DomainId;

    /// Resolve, scan and checkpoint for one state root message.
    async fn handle_message(&self, message: Message) -> StateRootResult<()>;
}
