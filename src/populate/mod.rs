//! Reference population
//!
//! Resolves foreign-key-like fields across a document batch: extract the
//! raw id tree per declared path, run one consolidated (cache-aware)
//! lookup per path, and reconcile the results back into each document's
//! field shape, honoring sort order, lean materialization, and
//! identifier-exclusion semantics.

mod assign;
mod errors;
mod path;
mod raw_ids;
mod resolver;

pub use errors::{PopulateError, PopulateResult};
pub use path::{PathOptions, ReferencePath, ReferenceTargets, StaticTargets};
pub use raw_ids::{stringify_id, RawIds};
pub use resolver::{PopulateTarget, ReferenceResolver};
