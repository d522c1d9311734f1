//! Result materialization
//!
//! Turns raw stored/fetched rows into caller-visible results: lean mode
//! hands the rows back unchanged, hydrated mode initializes a `Document`
//! per row. The same materializer runs on cache hits and misses, which is
//! what keeps the result shape identical across the two paths.

use serde_json::Value;
use thiserror::Error;

use crate::document::Document;

/// Materialization errors
#[derive(Debug, Clone, Error)]
pub enum MaterializeError {
    /// A row that is not an object cannot hydrate into a document
    #[error("cannot hydrate non-object record: {0}")]
    NotADocument(String),
}

/// One materialized result
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Plain record, no behavior attached
    Lean(Value),
    /// Hydrated document with provenance
    Document(Document),
}

impl Record {
    /// The raw record behind this result
    pub fn body(&self) -> &Value {
        match self {
            Record::Lean(value) => value,
            Record::Document(doc) => doc.body(),
        }
    }

    /// Consume the result, returning the raw record
    pub fn into_body(self) -> Value {
        match self {
            Record::Lean(value) => value,
            Record::Document(doc) => doc.into_body(),
        }
    }

    /// Whether this is a lean result
    pub fn is_lean(&self) -> bool {
        matches!(self, Record::Lean(_))
    }

    /// The hydrated document, if this is not a lean result
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Record::Lean(_) => None,
            Record::Document(doc) => Some(doc),
        }
    }
}

/// An ordered materialized result set
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Lean(Vec<Value>),
    Documents(Vec<Document>),
}

impl Records {
    /// Number of results
    pub fn len(&self) -> usize {
        match self {
            Records::Lean(rows) => rows.len(),
            Records::Documents(docs) => docs.len(),
        }
    }

    /// Whether the result set is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw record views, in result order
    pub fn bodies(&self) -> Vec<&Value> {
        match self {
            Records::Lean(rows) => rows.iter().collect(),
            Records::Documents(docs) => docs.iter().map(Document::body).collect(),
        }
    }

    /// Consume the set, returning raw records in result order
    pub fn into_bodies(self) -> Vec<Value> {
        match self {
            Records::Lean(rows) => rows,
            Records::Documents(docs) => docs.into_iter().map(Document::into_body).collect(),
        }
    }

    /// Assemble a set from individual records
    ///
    /// `lean` decides the variant; every record must match it.
    pub(crate) fn assemble(records: Vec<Record>, lean: bool) -> Self {
        if lean {
            Records::Lean(records.into_iter().map(Record::into_body).collect())
        } else {
            Records::Documents(
                records
                    .into_iter()
                    .filter_map(|record| match record {
                        Record::Document(doc) => Some(doc),
                        Record::Lean(_) => None,
                    })
                    .collect(),
            )
        }
    }
}

/// Turns raw rows into lean records or hydrated documents
pub struct ResultMaterializer;

impl ResultMaterializer {
    /// Materialize a single row
    pub fn materialize(
        row: Value,
        lean: bool,
        from_cache: bool,
    ) -> Result<Record, MaterializeError> {
        if lean {
            return Ok(Record::Lean(row));
        }
        let doc = if from_cache {
            Document::init_from_cache(row)?
        } else {
            Document::init(row)?
        };
        Ok(Record::Document(doc))
    }

    /// Materialize an ordered sequence of rows
    ///
    /// The first initialization failure fails the whole batch.
    pub fn materialize_many(
        rows: Vec<Value>,
        lean: bool,
        from_cache: bool,
    ) -> Result<Records, MaterializeError> {
        if lean {
            return Ok(Records::Lean(rows));
        }
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let doc = if from_cache {
                Document::init_from_cache(row)?
            } else {
                Document::init(row)?
            };
            docs.push(doc);
        }
        Ok(Records::Documents(docs))
    }
}
