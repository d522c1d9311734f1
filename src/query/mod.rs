//! Query descriptors for docucache
//!
//! A `QueryDescriptor` identifies one lookup against the data source:
//! target collection, conditions, projection, execution options, a per-query
//! cache directive, and any declared reference paths. Descriptors are frozen
//! once execution begins; the engine's `Query` decorator builds them.

mod descriptor;
mod options;
pub mod projection;

pub use descriptor::{CacheDirective, CacheKey, KeyFn, Operation, QueryDescriptor};
pub use options::{QueryOptions, SortOrder, SortSpec};
