//! Engine error types
//!
//! Store *read* failures never surface on the non-streaming paths; they
//! recover locally as cache misses. Store *write* failures always surface,
//! even though the live result was already computed: callers get
//! visibility into cache-backend degradation instead of silent fallback.

use thiserror::Error;

use crate::materialize::MaterializeError;
use crate::populate::PopulateError;
use crate::source::SourceError;
use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the caching engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The live result was computed but could not be cached
    #[error("cache write failed: {0}")]
    StoreWrite(#[source] StoreError),

    /// A streaming cache read failed with a non-miss backend error
    #[error("cache read failed: {0}")]
    StoreRead(#[source] StoreError),

    /// The underlying data source failed; never retried here
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Reference resolution failed for a whole path
    #[error(transparent)]
    Populate(#[from] PopulateError),

    /// A raw row could not hydrate
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

impl EngineError {
    /// Whether this is a cache-write failure
    pub fn is_store_write(&self) -> bool {
        matches!(self, EngineError::StoreWrite(_))
    }
}
