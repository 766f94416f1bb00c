//! Error types for graphset core primitives.

use thiserror::Error;

/// Errors from constructing or decoding core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("fid must be a positive integer")]
    InvalidFid,

    #[error("timestamp {0} does not fit in 4 bytes")]
    TimestampTooLarge(u64),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}
