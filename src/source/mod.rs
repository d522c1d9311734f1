//! Underlying data source
//!
//! The data source is the authoritative backend the cache sits in front
//! of. The engine calls through exactly four operations: `find`,
//! `find_one`, `stream`, and `geo_near`. `MemorySource` is the in-process
//! reference implementation; real deployments inject one backed by their
//! document store.

mod conditions;
mod errors;
mod memory;

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;
use serde::Serialize;
use serde_json::{json, Value};

use crate::query::QueryDescriptor;

pub use conditions::matches;
pub use errors::{SourceError, SourceResult};
pub use memory::MemorySource;

/// Future type returned by source operations
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = SourceResult<T>> + Send + 'a>>;

/// Row stream returned by streaming execution
pub type RowStream = Pin<Box<dyn Stream<Item = SourceResult<Value>> + Send>>;

/// One geo result: a document plus its distance from the query point
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRow {
    pub distance: f64,
    pub document: Value,
}

impl GeoRow {
    /// Wire form, `{"dis": .., "obj": ..}`, which is also the stored cache form
    pub fn to_value(&self) -> Value {
        json!({"dis": self.distance, "obj": self.document})
    }

    /// Parse the wire form back; malformed rows yield `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        let distance = value.get("dis")?.as_f64()?;
        let document = value.get("obj")?.clone();
        Some(Self { distance, document })
    }
}

/// Options for a geoNear execution
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeoOptions {
    pub lean: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    pub spherical: bool,
}

/// A geoNear query: target collection, query geometry, options
#[derive(Debug, Clone, Serialize)]
pub struct GeoQuery {
    pub collection: String,
    /// GeoJSON-style geometry, `{"type": "Point", "coordinates": [x, y]}`
    pub geometry: Value,
    pub options: GeoOptions,
}

impl GeoQuery {
    /// Point query against a collection
    pub fn point(collection: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            collection: collection.into(),
            geometry: json!({"type": "Point", "coordinates": [x, y]}),
            options: GeoOptions::default(),
        }
    }
}

/// Underlying data source contract
///
/// These are the only operations the caching layer calls through to.
pub trait DataSource: Send + Sync {
    /// Execute a find, returning raw rows in source order
    fn find(&self, descriptor: &QueryDescriptor) -> SourceFuture<'_, Vec<Value>>;

    /// Execute a findOne, returning the first raw row if any
    fn find_one(&self, descriptor: &QueryDescriptor) -> SourceFuture<'_, Option<Value>>;

    /// Execute a streaming find
    fn stream(&self, descriptor: &QueryDescriptor) -> RowStream;

    /// Execute a geoNear, returning rows ordered by distance
    fn geo_near(&self, query: &GeoQuery) -> SourceFuture<'_, Vec<GeoRow>>;
}
