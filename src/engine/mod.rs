//! The query cache coordinator
//!
//! `CacheEngine` composes the injected store, data source, configuration,
//! and reference targets. `Query` is the per-call decorator: it freezes a
//! descriptor, drives the read-through protocol, and exposes the
//! from-cache / cache-enabled flags afterwards. Streaming and geoNear get
//! their own execution paths with the protocol variations they inherit.

#[allow(clippy::module_inception)]
mod engine;
mod errors;
mod geo;
mod query;
mod stream;

pub use engine::CacheEngine;
pub use errors::{EngineError, EngineResult};
pub use geo::{GeoCache, GeoNearOutcome, GeoRecord};
pub use query::Query;
pub use stream::DocumentStream;
