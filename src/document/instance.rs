//! Document instances with population provenance

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::materialize::MaterializeError;
use crate::query::projection::ID_FIELD;

use super::path::{get_path, set_path};

/// Ids recorded for a populated path, with the model they were resolved
/// against
#[derive(Debug, Clone, PartialEq)]
pub struct PopulatedEntry {
    pub ids: Value,
    pub model: String,
}

/// A hydrated document
///
/// Carries the raw record plus the state a repeated population call needs:
/// the populated-path ledger, the modified-path set, and the from-cache
/// provenance flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    body: Value,
    from_cache: bool,
    modified: HashSet<String>,
    populated: HashMap<String, PopulatedEntry>,
}

impl Document {
    /// Hydrate a raw record
    ///
    /// Only object records hydrate; anything else is an initialization
    /// failure.
    pub fn init(body: Value) -> Result<Self, MaterializeError> {
        if !body.is_object() {
            return Err(MaterializeError::NotADocument(body.to_string()));
        }
        Ok(Self {
            body,
            from_cache: false,
            modified: HashSet::new(),
            populated: HashMap::new(),
        })
    }

    /// Hydrate a raw record produced by a cache hit
    pub fn init_from_cache(body: Value) -> Result<Self, MaterializeError> {
        let mut doc = Self::init(body)?;
        doc.from_cache = true;
        Ok(doc)
    }

    /// The document identifier, if present
    pub fn id(&self) -> Option<&Value> {
        self.body.get(ID_FIELD)
    }

    /// The raw record
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Consume the document, returning the raw record
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Read a dotted-path field
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.body, path)
    }

    /// Write a dotted-path field, marking the path modified
    pub fn set(&mut self, path: &str, value: Value) {
        set_path(&mut self.body, path, value);
        self.modified.insert(path.to_string());
    }

    /// Write a dotted-path field without marking it modified
    ///
    /// Population assignment goes through here: a populated path must stay
    /// unmodified so a later populate call can reuse the recorded ids.
    pub(crate) fn assign_raw(&mut self, path: &str, value: Value) {
        set_path(&mut self.body, path, value);
    }

    /// Whether the path was modified since hydration
    pub fn is_modified(&self, path: &str) -> bool {
        self.modified.contains(path)
    }

    /// Mark a path modified without writing it
    pub fn mark_modified(&mut self, path: &str) {
        self.modified.insert(path.to_string());
    }

    /// Ids recorded for a previously populated path
    pub fn populated(&self, path: &str) -> Option<&PopulatedEntry> {
        self.populated.get(path)
    }

    /// Record the ids a population call resolved for a path
    pub(crate) fn set_populated(&mut self, path: &str, ids: Value, model: &str) {
        self.populated.insert(
            path.to_string(),
            PopulatedEntry {
                ids,
                model: model.to_string(),
            },
        );
    }

    /// Whether this instance came from a cache hit
    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_init_requires_object() {
        assert!(Document::init(json!({"_id": "a"})).is_ok());
        assert!(Document::init(json!("scalar")).is_err());
        assert!(Document::init(json!(null)).is_err());
        assert!(Document::init(json!([1, 2])).is_err());
    }

    #[test]
    fn test_from_cache_flag() {
        let doc = Document::init(json!({"_id": "a"})).unwrap();
        assert!(!doc.is_from_cache());

        let doc = Document::init_from_cache(json!({"_id": "a"})).unwrap();
        assert!(doc.is_from_cache());
    }

    #[test]
    fn test_set_marks_modified() {
        let mut doc = Document::init(json!({"_id": "a", "peer": "b"})).unwrap();
        assert!(!doc.is_modified("peer"));

        doc.set("peer", json!("c"));
        assert!(doc.is_modified("peer"));
        assert_eq!(doc.get("peer"), Some(&json!("c")));
    }

    #[test]
    fn test_assign_raw_does_not_mark_modified() {
        let mut doc = Document::init(json!({"_id": "a", "peer": "b"})).unwrap();
        doc.assign_raw("peer", json!({"_id": "b"}));
        assert!(!doc.is_modified("peer"));
    }

    #[test]
    fn test_populated_ledger() {
        let mut doc = Document::init(json!({"_id": "a", "peer": "b"})).unwrap();
        assert!(doc.populated("peer").is_none());

        doc.set_populated("peer", json!("b"), "people");
        let entry = doc.populated("peer").unwrap();
        assert_eq!(entry.ids, json!("b"));
        assert_eq!(entry.model, "people");
    }
}
