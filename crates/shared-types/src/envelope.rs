//! # Cross-Domain `Message` Envelope
//!
//! The universal wrapper for everything that travels between domains.
//!
//! ## Properties
//!
//! - **Routing**: `source` and `destination` domain ids.
//! - **Correlation**: `id` identifies one cross-chain flow in every log line.
//! - **Tagged Payload**: the payload is a closed sum type; the `MessageType`
//!   tag is derived from it rather than stored next to it.
//! - **Immutable**: messages are never mutated after construction.

use crate::entities::{BlockNumber, Deposit, DomainId, Hash, U256};
use crate::errors::MessageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type tag selecting the handler a message is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// A finalized state root of the destination domain.
    StateRoot,
    /// A deposit to be proven and executed on the destination domain.
    Transfer,
}

impl MessageType {
    /// Wire name of the tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::StateRoot => "EVMStateRootMessage",
            MessageType::Transfer => "EVMTransferMessage",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EVMStateRootMessage" => Ok(MessageType::StateRoot),
            "EVMTransferMessage" => Ok(MessageType::Transfer),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }
}

/// State root payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRootData {
    /// Execution state root.
    pub state_root: Hash,
    /// Consensus slot the state root was finalized at.
    pub slot: U256,
}

/// Transfer payload produced by deposit scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferData {
    /// The deposit being transferred.
    pub deposit: Deposit,
    /// Slot of the state root the deposit is provable against.
    pub slot: U256,
    /// Block the deposit was included in.
    pub block_number: BlockNumber,
}

/// All payloads a `Message` can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagePayload {
    StateRoot(StateRootData),
    Transfer(TransferData),
}

impl MessagePayload {
    /// Type tag of this payload.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::StateRoot(_) => MessageType::StateRoot,
            MessagePayload::Transfer(_) => MessageType::Transfer,
        }
    }
}

/// Envelope carrying one payload from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Domain the message originates from.
    pub source: DomainId,
    /// Domain the message is destined to.
    pub destination: DomainId,
    /// Correlation id, unique per cross-chain flow.
    pub id: String,
    /// The payload.
    pub payload: MessagePayload,
}

impl Message {
    /// Create a state root message.
    #[must_use]
    pub fn state_root(
        source: DomainId,
        destination: DomainId,
        data: StateRootData,
        id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            destination,
            id: id.into(),
            payload: MessagePayload::StateRoot(data),
        }
    }

    /// Create a transfer message.
    #[must_use]
    pub fn transfer(
        source: DomainId,
        destination: DomainId,
        data: TransferData,
        id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            destination,
            id: id.into(),
            payload: MessagePayload::Transfer(data),
        }
    }

    /// Type tag of the carried payload.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }
}
