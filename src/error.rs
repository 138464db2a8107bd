//! Error types for the persistence boundary.
//!
//! Nothing in the stopwatch engine or lap ledger can fail; every failure
//! surface lives where the widget touches durable storage.

/// Failure while reading or writing durable state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage medium cannot be used at all.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The medium refused a write because it is full.
    #[error("storage quota exceeded while writing {key}")]
    QuotaExceeded { key: String },

    /// A stored entry could not be decoded.
    #[error("corrupt entry {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    /// A backup snapshot (or one of its keys) was rejected.
    #[error("malformed import: {0}")]
    MalformedImport(String),

    /// Value could not be encoded.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, StoreError>;
