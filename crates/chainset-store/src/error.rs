use chainset_types::TypeError;

/// Errors from entry store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert hit a key that is already stored.
    #[error("entry already present for key {0}")]
    AlreadyPresent(String),

    /// An update or delete named a key that isn't stored.
    #[error("no entry for key {0}")]
    NotFound(String),

    /// A change was computed against a value the store no longer holds.
    #[error("stale change at key {key}: {reason}")]
    Stale { key: String, reason: String },

    /// Invalid entry or duplicate key in decoded input.
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generator or scan parameters that can't be satisfied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
