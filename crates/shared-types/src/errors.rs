//! # Error Types
//!
//! Defines error types shared across relay components.

use thiserror::Error;

/// Errors raised while decoding raw contract logs into typed events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventDecodeError {
    /// Log data is not a valid ABI encoding of the event's parameters.
    #[error("Invalid log data: {0}")]
    Abi(String),

    /// A decoded integer or byte field does not fit its relay type.
    #[error("Field `{field}` out of range")]
    OutOfRange { field: &'static str },

    /// Decoded tokens do not have the shape of the named event.
    #[error("Unexpected token layout for {0}")]
    UnexpectedLayout(&'static str),
}

/// Errors related to message routing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Message type tag is not known to this relayer.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// Payload variant does not match what the receiving handler expects.
    #[error("Unexpected payload: expected {expected}, got {actual}")]
    UnexpectedPayload {
        expected: &'static str,
        actual: &'static str,
    },
}
