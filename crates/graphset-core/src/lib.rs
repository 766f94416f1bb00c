//! # graphset core
//!
//! Pure primitives for the graphset social-graph store: messages,
//! identifiers, ordering, and encoding.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over already-validated data.
//!
//! ## Key Types
//!
//! - [`Message`] - An immutable Add/Remove fact about one owner
//! - [`Fid`] - The owner identity
//! - [`TsHash`] - The timestamp‖hash composite ordering key
//! - [`CustodyEvent`] - A registry event assigning control of an fid
//!
//! ## Ordering
//!
//! All tie-breaks flow through [`bytes_compare`], the one unsigned
//! lexicographic comparator, so every replica resolves conflicts
//! identically.

pub mod bytes;
pub mod custody;
pub mod encode;
pub mod error;
pub mod message;
pub mod time;
pub mod types;

pub use bytes::bytes_compare;
pub use custody::CustodyEvent;
pub use encode::{decode_value, encode_value};
pub use error::CoreError;
pub use message::{
    Address, LinkType, Message, MessageBody, MessageClass, MessageType, ReactionType, TargetId,
    UserDataField,
};
pub use time::{from_network_time, network_time_now, to_network_time, NETWORK_EPOCH_MS};
pub use types::{ContentHash, Fid, SignerKey, TsHash, CONTENT_HASH_BYTES, TS_HASH_BYTES};
