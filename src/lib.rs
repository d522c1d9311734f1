//! docucache - read-through caching and reference population for document
//! stores
//!
//! Two coupled pieces: a cache coordination protocol that decides when a
//! query result is served from a key-value store instead of the underlying
//! data source (TTL management and stream buffering included), and a
//! reference reconciliation engine that batches foreign-key lookups across
//! a document set, issues one consolidated query per path, and splices the
//! results back into each document's field shape.
//!
//! The document mapper, the store transport, and the source transport stay
//! outside: they are injected through the `CacheStore`, `DataSource`, and
//! `ReferenceTargets` seams. `MemoryStore` and `MemorySource` are the
//! in-process reference implementations.
//!
//! ```
//! use std::sync::Arc;
//! use docucache::{CacheConfig, CacheEngine, MemorySource, MemoryStore};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), docucache::EngineError> {
//! let source = Arc::new(MemorySource::new());
//! source.insert("people", json!({"name": "Ada"}));
//!
//! let engine = CacheEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     source,
//!     CacheConfig::new(),
//! );
//!
//! let query = engine.find("people", json!({})).cache();
//! let records = query.exec().await?;
//! assert_eq!(records.len(), 1);
//! assert!(!query.is_from_cache());
//!
//! let again = engine.find("people", json!({})).cache();
//! again.exec().await?;
//! assert!(again.is_from_cache());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod keygen;
pub mod materialize;
pub mod observability;
pub mod populate;
pub mod query;
pub mod source;
pub mod store;

pub use config::CacheConfig;
pub use document::Document;
pub use engine::{
    CacheEngine, DocumentStream, EngineError, EngineResult, GeoCache, GeoNearOutcome, GeoRecord,
    Query,
};
pub use keygen::KeyGenerator;
pub use materialize::{MaterializeError, Record, Records, ResultMaterializer};
pub use populate::{
    PopulateError, PopulateTarget, ReferencePath, ReferenceResolver, ReferenceTargets,
    StaticTargets,
};
pub use query::{
    CacheDirective, CacheKey, Operation, QueryDescriptor, QueryOptions, SortOrder, SortSpec,
};
pub use source::{DataSource, GeoOptions, GeoQuery, GeoRow, MemorySource, SourceError};
pub use store::{CacheStore, MemoryStore, StoreError};
