//! Strong type definitions for graphset identifiers.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Size in bytes of a message content hash.
pub const CONTENT_HASH_BYTES: usize = 20;

/// Size in bytes of a tsHash: 4-byte big-endian timestamp + 20-byte hash.
pub const TS_HASH_BYTES: usize = 4 + CONTENT_HASH_BYTES;

/// An owner identity: a positive integer assigned by the registry.
///
/// All of an owner's records live under a contiguous key range derived
/// from the big-endian encoding of this value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fid(u64);

impl Fid {
    /// Create a new Fid. Fails on zero, which is reserved.
    pub fn new(value: u64) -> Result<Self, CoreError> {
        if value == 0 {
            return Err(CoreError::InvalidFid);
        }
        Ok(Self(value))
    }

    /// Get the numeric value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Big-endian fixed-width encoding used in storage keys.
    pub const fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Decode from the fixed-width big-endian key encoding.
    pub fn from_be_slice(slice: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 8] = slice
            .try_into()
            .map_err(|_| CoreError::MalformedKey("fid must be 8 bytes".into()))?;
        Self::new(u64::from_be_bytes(arr))
    }
}

impl fmt::Debug for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fid({})", self.0)
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 20-byte collision-resistant digest over a message's canonical content.
///
/// The hash is computed and verified upstream; the store treats it as an
/// opaque, totally-ordered identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; CONTENT_HASH_BYTES]);

impl ContentHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CONTENT_HASH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; CONTENT_HASH_BYTES] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The composite ordering key: big-endian timestamp followed by content hash.
///
/// Lexicographic order on the raw bytes equals chronological order, with
/// the hash as a deterministic tie-break. This is the store's native
/// iteration and pruning order. Two distinct messages for the same owner
/// and slot class never share a tsHash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TsHash([u8; TS_HASH_BYTES]);

impl TsHash {
    /// Build from a timestamp and content hash.
    ///
    /// Fails if the timestamp does not fit in 4 bytes. This is a hard
    /// input-validation boundary, not a silent truncation.
    pub fn from_parts(timestamp: u64, hash: &ContentHash) -> Result<Self, CoreError> {
        let ts: u32 = timestamp
            .try_into()
            .map_err(|_| CoreError::TimestampTooLarge(timestamp))?;
        let mut bytes = [0u8; TS_HASH_BYTES];
        bytes[..4].copy_from_slice(&ts.to_be_bytes());
        bytes[4..].copy_from_slice(hash.as_bytes());
        Ok(Self(bytes))
    }

    /// Decode from a key suffix.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; TS_HASH_BYTES] = slice
            .try_into()
            .map_err(|_| CoreError::MalformedKey("tsHash must be 24 bytes".into()))?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; TS_HASH_BYTES] {
        &self.0
    }

    /// The timestamp component (seconds since the network epoch).
    pub fn timestamp(&self) -> u64 {
        let mut ts = [0u8; 4];
        ts.copy_from_slice(&self.0[..4]);
        u32::from_be_bytes(ts) as u64
    }

    /// The content hash component.
    pub fn content_hash(&self) -> ContentHash {
        let mut hash = [0u8; CONTENT_HASH_BYTES];
        hash.copy_from_slice(&self.0[4..]);
        ContentHash(hash)
    }
}

impl fmt::Debug for TsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TsHash(t={}, {})",
            self.timestamp(),
            &hex::encode(&self.0[4..])[..12]
        )
    }
}

impl AsRef<[u8]> for TsHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The key or address that authorized a message.
///
/// Either an Ed25519 public key (32 bytes) or a custody address (20 bytes).
/// The store treats it as opaque bytes; signature validity is established
/// upstream.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignerKey(Vec<u8>);

impl SignerKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignerKey({})", self.to_hex())
    }
}

impl AsRef<[u8]> for SignerKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for SignerKey {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
