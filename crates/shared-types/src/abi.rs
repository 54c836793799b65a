//! # Contract Log ABI
//!
//! Event topics plus the conversions between `ethabi` tokens and the relay's
//! plain identifier types. Encoding and decoding of log data is `ethabi`'s.

use crate::entities::{Address, Hash, U256};
use crate::errors::EventDecodeError;
use ethabi::{ParamType, Token};
use sha3::{Digest, Keccak256};

/// Keccak-256 of an event signature, i.e. the log's `topic0`.
#[must_use]
pub fn event_topic(signature: &str) -> Hash {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

const WORD: usize = 32;

/// Decode non-indexed log data into tokens of `types`.
///
/// Offsets and lengths of top-level `bytes`/`string` tails are bounds-checked
/// first, so hostile words surface as errors.
pub fn decode_log_data(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, EventDecodeError> {
    check_tails(types, data)?;
    ethabi::decode(types, data).map_err(|e| EventDecodeError::Abi(e.to_string()))
}

fn check_tails(types: &[ParamType], data: &[u8]) -> Result<(), EventDecodeError> {
    for (index, param) in types.iter().enumerate() {
        if !matches!(param, ParamType::Bytes | ParamType::String) {
            continue;
        }
        let offset = word_as_usize(data, index.checked_mul(WORD))?;
        let len = word_as_usize(data, Some(offset))?;
        offset
            .checked_add(WORD)
            .and_then(|start| start.checked_add(len))
            .filter(|end| *end <= data.len())
            .ok_or_else(|| EventDecodeError::Abi(format!("{param} tail out of bounds")))?;
    }
    Ok(())
}

fn word_as_usize(data: &[u8], at: Option<usize>) -> Result<usize, EventDecodeError> {
    let word = at
        .and_then(|start| data.get(start..start.checked_add(WORD)?))
        .ok_or_else(|| EventDecodeError::Abi("word out of bounds".to_string()))?;
    let value = ethabi::Uint::from_big_endian(word);
    if value.bits() > 64 {
        return Err(EventDecodeError::Abi("offset exceeds u64".to_string()));
    }
    usize::try_from(value.low_u64())
        .map_err(|_| EventDecodeError::Abi("offset exceeds usize".to_string()))
}

/// Encode tokens as log data.
#[must_use]
pub fn encode_log_data(tokens: &[Token]) -> Vec<u8> {
    ethabi::encode(tokens)
}

/// Narrow a `uintN` token into a small integer, rejecting values that do not fit.
pub fn small_uint<T: TryFrom<u64>>(
    value: ethabi::Uint,
    field: &'static str,
) -> Result<T, EventDecodeError> {
    if value.bits() > 64 {
        return Err(EventDecodeError::OutOfRange { field });
    }
    T::try_from(value.low_u64()).map_err(|_| EventDecodeError::OutOfRange { field })
}

pub fn uint_to_u256(value: ethabi::Uint) -> U256 {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    U256::from_big_endian(&buf)
}

pub fn u256_to_uint(value: U256) -> ethabi::Uint {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    ethabi::Uint::from_big_endian(&buf)
}

/// A `bytes32` token as a fixed array.
pub fn bytes32(value: &[u8], field: &'static str) -> Result<Hash, EventDecodeError> {
    Hash::try_from(value).map_err(|_| EventDecodeError::OutOfRange { field })
}

pub fn address_token(address: Address) -> Token {
    Token::Address(ethabi::Address::from(address))
}
