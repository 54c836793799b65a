//! # Core Domain Entities
//!
//! Typed representations of the on-chain facts the relayer observes.
//!
//! ## Clusters
//!
//! - **Identifiers**: `DomainId`, `BlockNumber`, `Hash`, `Address`
//! - **State Commitments**: `StateRootSubmitted`
//! - **Transfers**: `Deposit`, `DepositLog`

use crate::abi;
use crate::errors::EventDecodeError;
use ethabi::{ParamType, Token};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

// Re-export U256 from primitive-types for use across all components
pub use primitive_types::U256;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of one blockchain network participating in the bridge.
pub type DomainId = u8;

/// Execution-layer block number.
pub type BlockNumber = u64;

/// A 32-byte hash (state roots, resource ids, topics).
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Event signature of a state root commitment.
pub const STATE_ROOT_SUBMITTED_SIG: &str = "StateRootSubmitted(uint8,uint256,bytes32)";

/// Event signature of a bridge deposit.
pub const DEPOSIT_SIG: &str = "Deposit(uint8,uint8,bytes32,uint64,address,bytes)";

// =============================================================================
// STATE COMMITMENTS
// =============================================================================

/// A state root of `source_domain_id` committed on another domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRootSubmitted {
    /// Domain the state root belongs to.
    pub source_domain_id: DomainId,
    /// Finalized beacon slot belonging to the state root.
    pub slot: U256,
    /// Execution state root.
    pub state_root: Hash,
}

impl StateRootSubmitted {
    /// `topic0` of the event.
    #[must_use]
    pub fn topic() -> Hash {
        abi::event_topic(STATE_ROOT_SUBMITTED_SIG)
    }

    const PARAMS: [ParamType; 3] = [ParamType::Uint(8), ParamType::Uint(256), ParamType::FixedBytes(32)];

    /// Decode the event from non-indexed log data.
    pub fn from_log_data(data: &[u8]) -> Result<Self, EventDecodeError> {
        match abi::decode_log_data(&Self::PARAMS, data)?.as_slice() {
            [Token::Uint(source_domain_id), Token::Uint(slot), Token::FixedBytes(state_root)] => {
                Ok(Self {
                    source_domain_id: abi::small_uint(*source_domain_id, "source_domain_id")?,
                    slot: abi::uint_to_u256(*slot),
                    state_root: abi::bytes32(state_root, "state_root")?,
                })
            }
            _ => Err(EventDecodeError::UnexpectedLayout("StateRootSubmitted")),
        }
    }

    /// Encode the event as log data.
    #[must_use]
    pub fn to_log_data(&self) -> Vec<u8> {
        abi::encode_log_data(&[
            Token::Uint(self.source_domain_id.into()),
            Token::Uint(abi::u256_to_uint(self.slot)),
            Token::FixedBytes(self.state_root.to_vec()),
        ])
    }
}

// =============================================================================
// TRANSFERS
// =============================================================================

/// A transfer request emitted by the bridge contract on the source chain.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Domain the deposit will be bridged to.
    pub destination_domain_id: DomainId,
    /// Security model selecting the destination verifier set.
    pub security_model: u8,
    /// Resource id selecting the handler/asset logic.
    pub resource_id: Hash,
    /// Nonce of the deposit, unique per destination and resource.
    pub deposit_nonce: u64,
    /// Address of the depositor.
    pub sender_address: Address,
    /// Handler-specific deposit data.
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
}

impl Deposit {
    const PARAMS: [ParamType; 6] = [
        ParamType::Uint(8),
        ParamType::Uint(8),
        ParamType::FixedBytes(32),
        ParamType::Uint(64),
        ParamType::Address,
        ParamType::Bytes,
    ];

    /// `topic0` of the event.
    #[must_use]
    pub fn topic() -> Hash {
        abi::event_topic(DEPOSIT_SIG)
    }

    /// Decode the event from non-indexed log data.
    pub fn from_log_data(data: &[u8]) -> Result<Self, EventDecodeError> {
        match abi::decode_log_data(&Self::PARAMS, data)?.as_slice() {
            [Token::Uint(destination), Token::Uint(security_model), Token::FixedBytes(resource_id), Token::Uint(nonce), Token::Address(sender), Token::Bytes(payload)] => {
                Ok(Self {
                    destination_domain_id: abi::small_uint(*destination, "destination_domain_id")?,
                    security_model: abi::small_uint(*security_model, "security_model")?,
                    resource_id: abi::bytes32(resource_id, "resource_id")?,
                    deposit_nonce: abi::small_uint(*nonce, "deposit_nonce")?,
                    sender_address: sender.to_fixed_bytes(),
                    data: payload.clone(),
                })
            }
            _ => Err(EventDecodeError::UnexpectedLayout("Deposit")),
        }
    }

    /// Encode the event as log data.
    #[must_use]
    pub fn to_log_data(&self) -> Vec<u8> {
        abi::encode_log_data(&[
            Token::Uint(self.destination_domain_id.into()),
            Token::Uint(self.security_model.into()),
            Token::FixedBytes(self.resource_id.to_vec()),
            Token::Uint(self.deposit_nonce.into()),
            abi::address_token(self.sender_address),
            Token::Bytes(self.data.clone()),
        ])
    }

    /// Key used downstream for ordering and deduplication.
    #[must_use]
    pub fn dedup_key(&self) -> (DomainId, Hash, u64) {
        (self.destination_domain_id, self.resource_id, self.deposit_nonce)
    }
}

/// A decoded deposit together with where it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositLog {
    /// Block the deposit was included in.
    pub block_number: BlockNumber,
    /// The decoded event.
    pub deposit: Deposit,
}
