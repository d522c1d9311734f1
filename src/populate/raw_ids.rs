//! Raw identifier trees
//!
//! `RawIds` mirrors the shape of a reference field across a document
//! batch: per document a single id, an explicit null, an absent field, or
//! an ordered sequence, arbitrarily nested to support reference arrays
//! inside reference arrays. Reconciliation preserves the shape and only
//! replaces leaves.

use serde_json::Value;

/// The raw value of a reference field, before resolution
#[derive(Debug, Clone, PartialEq)]
pub enum RawIds {
    /// Field absent on the document
    Missing,
    /// Field explicitly null
    Null,
    /// A single identifier
    Id(Value),
    /// An ordered sequence, possibly nested
    Many(Vec<RawIds>),
}

impl RawIds {
    /// Build the tree from a field value
    ///
    /// Object leaves carrying `_id` are reduced to that id (a previously
    /// populated leaf); identifier objects and other scalars pass through.
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            None => RawIds::Missing,
            Some(Value::Null) => RawIds::Null,
            Some(Value::Array(items)) => RawIds::Many(
                items
                    .into_iter()
                    .map(|item| RawIds::from_value(Some(item)))
                    .collect(),
            ),
            Some(value) => RawIds::Id(reduce_to_id(value)),
        }
    }

    /// Whether the field was absent
    pub fn is_missing(&self) -> bool {
        matches!(self, RawIds::Missing)
    }

    /// Absent, null, or an empty sequence: nothing to look up from here
    pub fn is_empty_like(&self) -> bool {
        match self {
            RawIds::Missing | RawIds::Null => true,
            RawIds::Many(items) => items.is_empty(),
            RawIds::Id(_) => false,
        }
    }

    /// Visit every identifier leaf, skipping nulls and absent fields
    pub fn collect_ids(&self, visit: &mut impl FnMut(&Value)) {
        match self {
            RawIds::Id(id) => visit(id),
            RawIds::Many(items) => {
                for item in items {
                    item.collect_ids(visit);
                }
            }
            RawIds::Missing | RawIds::Null => {}
        }
    }

    /// The value form recorded in a document's populated ledger
    pub fn to_value(&self) -> Value {
        match self {
            RawIds::Missing | RawIds::Null => Value::Null,
            RawIds::Id(id) => id.clone(),
            RawIds::Many(items) => {
                Value::Array(items.iter().map(RawIds::to_value).collect())
            }
        }
    }
}

/// Reduce a previously populated object leaf to its identifier
fn reduce_to_id(value: Value) -> Value {
    if is_identifier_object(&value) {
        return value;
    }
    if let Some(id) = value.as_object().and_then(|map| map.get("_id")).cloned() {
        return id;
    }
    value
}

/// Whether a value is an extended-JSON identifier object, `{"$oid": "..."}`
pub fn is_identifier_object(value: &Value) -> bool {
    matches!(value.as_object(), Some(map) if map.len() == 1 && map.contains_key("$oid"))
}

/// Stringify an identifier for index keying
pub fn stringify_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => match map.get("$oid").and_then(Value::as_str) {
            Some(oid) => oid.to_string(),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}
