//! Cache store error types

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Cache store errors
///
/// A `get` miss is an error, not an empty value. The non-streaming read
/// path treats every `get` error as a miss; the streaming path recovers
/// only `Miss` and surfaces `Backend` errors to the consumer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Key absent or expired
    #[error("cache key not found")]
    Miss,

    /// Transport or backend failure
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Stored value could not be encoded or decoded
    #[error("cache value serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether this error is a plain miss
    pub fn is_miss(&self) -> bool {
        matches!(self, StoreError::Miss)
    }
}
