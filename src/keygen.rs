//! Deterministic cache-key generation
//!
//! Two descriptors with identical collection, conditions, projection,
//! update clause, path/distinct markers, options, and declared reference
//! paths produce the same key; any difference in those fields produces a
//! different one. The canonical form is JSON over a fixed-order view, so
//! field order never depends on caller construction order. Condition
//! *values* are not normalized: `{"$in": [1, 2]}` and `{"$in": [2, 1]}`
//! key differently (known limitation).

use serde::Serialize;
use serde_json::Value;

use crate::query::{QueryDescriptor, QueryOptions};

/// Fixed-order serializable view of a descriptor
#[derive(Serialize)]
struct CanonicalView<'a> {
    model: &'a str,
    op: &'a str,
    options: &'a QueryOptions,
    cond: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distinct: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    populate: Vec<Value>,
}

/// Derives cache keys from query descriptors
pub struct KeyGenerator;

impl KeyGenerator {
    /// Serialize a descriptor into its canonical key
    pub fn derive(descriptor: &QueryDescriptor) -> String {
        let view = CanonicalView {
            model: &descriptor.collection,
            op: descriptor.operation.name(),
            options: &descriptor.options,
            cond: &descriptor.conditions,
            fields: descriptor.fields.as_ref(),
            update: descriptor.update.as_ref(),
            path: descriptor.path.as_deref(),
            distinct: descriptor.distinct.as_deref(),
            populate: descriptor
                .populate
                .iter()
                .map(|path| path.key_view())
                .collect(),
        };
        // Serialization of a Serialize view over Value cannot fail
        serde_json::to_string(&view).expect("canonical key serialization")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populate::ReferencePath;
    use crate::query::{Operation, SortSpec};
    use serde_json::json;

    fn descriptor(conditions: Value) -> QueryDescriptor {
        QueryDescriptor::new("people", Operation::Find, conditions)
    }

    #[test]
    fn test_equal_descriptors_share_a_key() {
        let a = descriptor(json!({"name": "Ada"}));
        let b = descriptor(json!({"name": "Ada"}));
        assert_eq!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));
    }

    #[test]
    fn test_conditions_change_the_key() {
        let a = descriptor(json!({"name": "Ada"}));
        let b = descriptor(json!({"name": "Grace"}));
        assert_ne!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));
    }

    #[test]
    fn test_options_change_the_key() {
        let a = descriptor(json!({}));
        let mut b = descriptor(json!({}));
        b.options.sort = Some(SortSpec::asc("num"));
        assert_ne!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));

        let mut c = descriptor(json!({}));
        c.options.limit = Some(5);
        assert_ne!(KeyGenerator::derive(&a), KeyGenerator::derive(&c));
    }

    #[test]
    fn test_fields_change_the_key() {
        let a = descriptor(json!({}));
        let mut b = descriptor(json!({}));
        b.fields = Some(json!("name"));
        assert_ne!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));
    }

    #[test]
    fn test_operation_changes_the_key() {
        let a = descriptor(json!({}));
        let b = QueryDescriptor::new("people", Operation::FindOne, json!({}));
        assert_ne!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));
    }

    #[test]
    fn test_collection_changes_the_key() {
        let a = descriptor(json!({}));
        let b = QueryDescriptor::new("pets", Operation::Find, json!({}));
        assert_ne!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));
    }

    #[test]
    fn test_populate_paths_change_the_key() {
        let a = descriptor(json!({}));
        let mut b = descriptor(json!({}));
        b.populate.push(ReferencePath::new("peer"));
        assert_ne!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));
    }

    #[test]
    fn test_lean_flag_does_not_change_the_key() {
        // lean and hydrated reads share the stored raw value and diverge
        // only at materialization time
        let a = descriptor(json!({}));
        let mut b = descriptor(json!({}));
        b.options.lean = true;
        assert_eq!(KeyGenerator::derive(&a), KeyGenerator::derive(&b));
    }
}
