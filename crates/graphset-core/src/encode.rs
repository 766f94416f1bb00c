//! Message encoding for storage.
//!
//! Messages are stored as deterministic CBOR. The encoding only needs to
//! round-trip within one node; the wire format used between peers is a
//! separate subsystem.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

/// Encode a value to CBOR bytes.
pub fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| CoreError::Encoding(e.to_string()))?;
    Ok(bytes)
}

/// Decode a value from CBOR bytes.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CoreError> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
}
