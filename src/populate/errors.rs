//! Population error types

use thiserror::Error;

use crate::engine::EngineError;
use crate::materialize::MaterializeError;

/// Result type for population operations
pub type PopulateResult<T> = Result<T, PopulateError>;

/// Population errors
///
/// A path either resolves completely or fails as a whole; partial
/// per-document results are never produced.
#[derive(Debug, Error)]
pub enum PopulateError {
    /// No target collection could be resolved for the path
    #[error("cannot resolve a target collection for path '{path}' on '{model}'")]
    Configuration { model: String, path: String },

    /// The consolidated lookup failed
    #[error("reference lookup failed: {0}")]
    Lookup(#[source] Box<EngineError>),

    /// A matched row could not hydrate during reconciliation
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}
