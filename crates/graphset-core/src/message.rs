//! The message model: immutable, signature-verified facts.
//!
//! A [`Message`] is created by the upstream validation layer and handed to
//! the stores fully formed. The store never constructs messages itself and
//! never mutates them; it only adds or deletes whole records.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ContentHash, Fid, SignerKey, TsHash};

/// Whether a message asserts or retracts a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageClass {
    Add,
    Remove,
}

/// Discriminator for every message family and class.
///
/// The numeric values are part of the by-signer key encoding and must not
/// be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    SignerAdd = 1,
    SignerRemove = 2,
    LinkAdd = 3,
    LinkRemove = 4,
    ReactionAdd = 5,
    ReactionRemove = 6,
    VerificationAdd = 7,
    VerificationRemove = 8,
    UserDataAdd = 9,
}

impl MessageType {
    /// The Add/Remove class of this type.
    pub fn class(&self) -> MessageClass {
        match self {
            MessageType::SignerAdd
            | MessageType::LinkAdd
            | MessageType::ReactionAdd
            | MessageType::VerificationAdd
            | MessageType::UserDataAdd => MessageClass::Add,
            MessageType::SignerRemove
            | MessageType::LinkRemove
            | MessageType::ReactionRemove
            | MessageType::VerificationRemove => MessageClass::Remove,
        }
    }

    /// Decode from the byte stored in by-signer index keys.
    pub fn from_u8(value: u8) -> Result<Self, CoreError> {
        match value {
            1 => Ok(MessageType::SignerAdd),
            2 => Ok(MessageType::SignerRemove),
            3 => Ok(MessageType::LinkAdd),
            4 => Ok(MessageType::LinkRemove),
            5 => Ok(MessageType::ReactionAdd),
            6 => Ok(MessageType::ReactionRemove),
            7 => Ok(MessageType::VerificationAdd),
            8 => Ok(MessageType::VerificationRemove),
            9 => Ok(MessageType::UserDataAdd),
            other => Err(CoreError::MalformedMessage(format!(
                "unknown message type {other}"
            ))),
        }
    }
}

/// A kind of relationship between two owners.
///
/// Encoded as a single byte in slot and index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkType(pub u8);

impl LinkType {
    pub const FOLLOW: LinkType = LinkType(1);
}

/// A kind of reaction to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReactionType {
    Like = 1,
    Recast = 2,
}

impl ReactionType {
    /// Decode from the byte stored in index keys.
    pub fn from_u8(value: u8) -> Result<Self, CoreError> {
        match value {
            1 => Ok(ReactionType::Like),
            2 => Ok(ReactionType::Recast),
            other => Err(CoreError::MalformedMessage(format!(
                "unknown reaction type {other}"
            ))),
        }
    }
}

/// The object a reaction points at: another owner's message, addressed by
/// its author and tsHash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId {
    pub fid: Fid,
    pub ts_hash: TsHash,
}

impl TargetId {
    /// Fixed-width key encoding: 8-byte fid + 24-byte tsHash.
    pub fn to_key_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&self.fid.to_be_bytes());
        bytes[8..].copy_from_slice(self.ts_hash.as_bytes());
        bytes
    }

    /// Decode from the fixed-width key encoding.
    pub fn from_key_bytes(slice: &[u8]) -> Result<Self, CoreError> {
        if slice.len() != 32 {
            return Err(CoreError::MalformedKey("target id must be 32 bytes".into()));
        }
        Ok(Self {
            fid: Fid::from_be_slice(&slice[..8])?,
            ts_hash: TsHash::from_slice(&slice[8..])?,
        })
    }
}

/// A 20-byte external account address (e.g. an Ethereum address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 20] = slice
            .try_into()
            .map_err(|_| CoreError::MalformedKey("address must be 20 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A profile field that an owner may set at most one value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UserDataField {
    Pfp = 1,
    Display = 2,
    Bio = 3,
    Url = 5,
    Username = 6,
}

/// Type-specific payload carried by a message.
///
/// The body variant must agree with the message type; the stores reject
/// mismatches before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    /// The delegate key being authorized or retired.
    Signer { signer: SignerKey },
    /// A directed relationship to another owner.
    Link { link_type: LinkType, target_fid: Fid },
    /// A reaction to a target message.
    Reaction {
        reaction_type: ReactionType,
        target: TargetId,
    },
    /// Proof that the owner controls an external address.
    VerificationAdd {
        address: Address,
        claim_signature: Vec<u8>,
        block_hash: [u8; 32],
    },
    /// Retraction of a previous address verification.
    VerificationRemove { address: Address },
    /// A profile field value. An empty value resets the field.
    UserData { field: UserDataField, value: String },
}

/// An immutable, content-addressed fact about one owner.
///
/// Arrives already signature-verified; `fid`, `timestamp`, `hash`, `signer`
/// and the body are trusted as given. `timestamp` is seconds since the
/// network epoch, attacker-supplied but clock-skew-bounded upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub fid: Fid,
    pub message_type: MessageType,
    pub timestamp: u64,
    pub hash: ContentHash,
    pub signer: SignerKey,
    pub body: MessageBody,
}

impl Message {
    /// The Add/Remove class of this message.
    pub fn class(&self) -> MessageClass {
        self.message_type.class()
    }

    /// The composite ordering key for this message.
    ///
    /// Fails if the timestamp does not fit in 4 bytes.
    pub fn ts_hash(&self) -> Result<TsHash, CoreError> {
        TsHash::from_parts(self.timestamp, &self.hash)
    }
}
