//! Error types for the store crate.

use graphset_core::{CoreError, Fid};
use graphset_db::DbError;
use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Every mutating operation fails atomically: on any error the on-disk
/// state is exactly what it was before the call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The message is malformed or not handled by this store. Rejected
    /// before any state change.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A record with the identical tsHash is already live. Callers may
    /// treat this as idempotent success.
    #[error("message has already been merged")]
    Duplicate,

    /// A more recent or tie-winning record already occupies the slot.
    /// Do not resubmit without a newer message.
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// No live record matches. A normal negative result for reads.
    #[error("not found: {0}")]
    NotFound(String),

    /// Custody events collide at the same chain position with different
    /// block or transaction hashes. Indicates a reorg or corrupted input;
    /// surface to the operator rather than retrying.
    #[error("conflicting chain data for fid {fid} at block {block_number} log {log_index}")]
    ConflictingChainData {
        fid: Fid,
        block_number: u64,
        log_index: u32,
    },

    /// Storage engine failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        StoreError::InvalidInput(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
