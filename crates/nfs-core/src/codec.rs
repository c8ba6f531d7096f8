//! Envelope codec.
//!
//! All wire structures are encoded with bincode using fixed-width integers,
//! a size limit and strict rejection of trailing bytes, so every accepted
//! byte string has exactly one decoding.

use crate::{MessageAction, MessageId, NfsError, Persona, Result};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on any single encoded structure.
pub const MAX_ENCODED_SIZE: u64 = 16 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_ENCODED_SIZE)
        .reject_trailing_bytes()
}

/// Encode a wire structure. Failures are reported as invalid parameters.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| NfsError::invalid_parameter(format_args!("encode failed: {e}")))
}

/// Decode a wire structure. Failures are reported as parsing errors.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options()
        .deserialize(bytes)
        .map_err(|e| NfsError::parsing(format_args!("decode failed: {e}")))
}

/// The uniform wire tuple every typed wrapper erases to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeErasedMessageWrapper {
    pub action: MessageAction,
    pub source: Persona,
    pub destination: Persona,
    pub message_id: MessageId,
    pub payload: Vec<u8>,
}

/// Encode the erased tuple of a typed wrapper.
pub fn serialise_message_wrapper(tuple: &TypeErasedMessageWrapper) -> Result<Vec<u8>> {
    tracing::trace!(
        action = ?tuple.action,
        message_id = %tuple.message_id,
        payload_len = tuple.payload.len(),
        "serialising message wrapper"
    );
    encode(tuple)
}

/// Decode the erased tuple without checking it against any route.
pub fn parse_message_wrapper(bytes: &[u8]) -> Result<TypeErasedMessageWrapper> {
    decode(bytes)
}
