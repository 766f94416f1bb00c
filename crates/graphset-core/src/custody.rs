//! Custody events from the on-chain identity registry.

use serde::{Deserialize, Serialize};

use crate::message::Address;
use crate::types::Fid;

/// A registration or transfer event for an owner id, observed on the
/// registry contract's ordered event log.
///
/// Events are totally ordered by `(block_number, log_index)`. Two events at
/// the same position with different block or transaction hashes indicate a
/// chain reorg or corrupted input, never a CRDT conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyEvent {
    pub fid: Fid,
    /// The address that controls the fid after this event.
    pub to: Address,
    pub block_number: u64,
    pub log_index: u32,
    pub block_hash: [u8; 32],
    pub transaction_hash: [u8; 32],
}
