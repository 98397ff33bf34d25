use thiserror::Error;

/// Errors produced while building or decoding difference values.
///
/// Keys are carried as their `Debug` rendering so the error type stays
/// independent of the caller's key type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Both sides absent, or a reference whose sides name different keys.
    #[error("invalid difference entry: {0}")]
    InvalidDifferenceEntry(String),

    /// An update was requested between two entries with different keys.
    #[error("key mismatch: before has key {before}, after has key {after}")]
    KeyMismatch { before: String, after: String },

    /// A difference collection holds two entries for the same key.
    #[error("duplicate key in difference: {0}")]
    DuplicateKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
