//! Data source error types

use thiserror::Error;

/// Result type for data source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Underlying data source errors
///
/// The caching layer surfaces these untouched and never retries.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The source rejected the query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The query ran and failed
    #[error("source execution failed: {0}")]
    Execution(String),

    /// The source could not be reached
    #[error("source unavailable: {0}")]
    Unavailable(String),
}
