//! In-memory data source

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use futures_util::stream;
use serde_json::Value;
use uuid::Uuid;

use crate::document::path::get_path;
use crate::query::projection;
use crate::query::{QueryDescriptor, SortOrder, SortSpec};

use super::conditions;
use super::errors::{SourceError, SourceResult};
use super::{DataSource, GeoQuery, GeoRow, RowStream, SourceFuture};

/// In-process document source
///
/// Collections are ordered vectors of raw documents; insertion order is
/// the unsorted result order. Inserted documents get a generated `_id`
/// when they carry none.
#[derive(Debug, Default)]
pub struct MemorySource {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, generating an `_id` if absent; returns the id
    pub fn insert(&self, collection: &str, mut document: Value) -> String {
        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Some(object) = document.as_object_mut() {
            object
                .entry("_id".to_string())
                .or_insert_with(|| Value::String(id.clone()));
        }

        if let Ok(mut collections) = self.collections.write() {
            collections
                .entry(collection.to_string())
                .or_default()
                .push(document);
        }
        id
    }

    /// Insert a batch, returning the ids in input order
    pub fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Vec<String> {
        documents
            .into_iter()
            .map(|doc| self.insert(collection, doc))
            .collect()
    }

    /// Drop every document in a collection
    pub fn remove_all(&self, collection: &str) {
        if let Ok(mut collections) = self.collections.write() {
            collections.remove(collection);
        }
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn run_find(&self, descriptor: &QueryDescriptor) -> SourceResult<Vec<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| SourceError::Execution("source lock poisoned".into()))?;

        let mut rows: Vec<Value> = collections
            .get(&descriptor.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| conditions::matches(doc, &descriptor.conditions))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &descriptor.options.sort {
            sort_rows(&mut rows, sort);
        }
        if let Some(skip) = descriptor.options.skip {
            rows.drain(..rows.len().min(skip as usize));
        }
        if let Some(limit) = descriptor.options.limit {
            rows.truncate(limit as usize);
        }
        if let Some(select) = &descriptor.fields {
            rows = rows
                .iter()
                .map(|row| projection::apply(row, select))
                .collect();
        }
        Ok(rows)
    }

    fn run_geo_near(&self, query: &GeoQuery) -> SourceResult<Vec<GeoRow>> {
        let point = query
            .geometry
            .get("coordinates")
            .and_then(Value::as_array)
            .and_then(|coords| {
                Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
            })
            .ok_or_else(|| SourceError::InvalidQuery("geometry must carry [x, y]".into()))?;

        let collections = self
            .collections
            .read()
            .map_err(|_| SourceError::Execution("source lock poisoned".into()))?;

        let mut rows: Vec<GeoRow> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter_map(|doc| {
                        let distance = document_distance(doc, point)?;
                        Some(GeoRow {
                            distance,
                            document: doc.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(max) = query.options.max_distance {
            rows.retain(|row| row.distance <= max);
        }
        rows.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        if let Some(limit) = query.options.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }
}

impl DataSource for MemorySource {
    fn find(&self, descriptor: &QueryDescriptor) -> SourceFuture<'_, Vec<Value>> {
        let result = self.run_find(descriptor);
        Box::pin(async move { result })
    }

    fn find_one(&self, descriptor: &QueryDescriptor) -> SourceFuture<'_, Option<Value>> {
        let result = self.run_find(descriptor).map(|rows| rows.into_iter().next());
        Box::pin(async move { result })
    }

    fn stream(&self, descriptor: &QueryDescriptor) -> RowStream {
        match self.run_find(descriptor) {
            Ok(rows) => Box::pin(stream::iter(rows.into_iter().map(Ok))),
            Err(err) => Box::pin(stream::iter(vec![Err(err)])),
        }
    }

    fn geo_near(&self, query: &GeoQuery) -> SourceFuture<'_, Vec<GeoRow>> {
        let result = self.run_geo_near(query);
        Box::pin(async move { result })
    }
}

/// Planar distance from the document's location field to the query point
fn document_distance(doc: &Value, point: (f64, f64)) -> Option<f64> {
    let location = doc.get("location").or_else(|| doc.get("loc"))?;
    let coords = location
        .get("coordinates")
        .and_then(Value::as_array)
        .or_else(|| location.as_array())?;
    let x = coords.first()?.as_f64()?;
    let y = coords.get(1)?.as_f64()?;
    Some(((x - point.0).powi(2) + (y - point.1).powi(2)).sqrt())
}

/// Stable sort by a single field, null/missing first, type-ordered
fn sort_rows(rows: &mut [Value], spec: &SortSpec) {
    rows.sort_by(|a, b| {
        let ordering = compare_values(get_path(a, &spec.field), get_path(b, &spec.field));
        match spec.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let type_order = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let (ta, tb) = (type_order(a), type_order(b));
            if ta != tb {
                return ta.cmp(&tb);
            }
            match (a, b) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => {
                    let xf = x.as_f64().unwrap_or(0.0);
                    let yf = y.as_f64().unwrap_or(0.0);
                    xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
                }
                (Value::String(x), Value::String(y)) => x.cmp(y),
                _ => Ordering::Equal,
            }
        }
    }
}
