//! Error types for the database abstraction.

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// No value exists for the requested key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The stored data could not be interpreted.
    #[error("corrupt value at key {key}: {reason}")]
    Corruption { key: String, reason: String },

    /// Backend I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;
