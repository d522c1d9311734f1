//! Field projection helpers
//!
//! Projections come in two shapes, mirroring the data-source conventions:
//! a space-separated string (`"name num -secret"`, `-` prefix excludes) or
//! an object (`{"name": 1}` / `{"secret": 0}`). The identifier field is
//! included by default and must be excluded explicitly.

use serde_json::{Map, Value};

/// The identifier field name
pub const ID_FIELD: &str = "_id";

/// Whether a projection asks to exclude the identifier field
pub fn excludes_id(select: &Value) -> bool {
    match select {
        Value::String(s) => s.split_whitespace().any(|tok| tok == "-_id"),
        Value::Object(map) => matches!(map.get(ID_FIELD), Some(v) if is_zero(v)),
        _ => false,
    }
}

/// Remove an identifier exclusion from a projection, leaving the rest intact
///
/// Used by the reference resolver: the outgoing lookup must keep `_id` for
/// matching even when the caller asked to drop it.
pub fn strip_id_exclusion(select: &Value) -> Value {
    match select {
        Value::String(s) => {
            let kept: Vec<&str> = s.split_whitespace().filter(|tok| *tok != "-_id").collect();
            Value::String(kept.join(" "))
        }
        Value::Object(map) => {
            let mut copy = map.clone();
            if matches!(copy.get(ID_FIELD), Some(v) if is_zero(v)) {
                copy.remove(ID_FIELD);
            }
            Value::Object(copy)
        }
        other => other.clone(),
    }
}

/// Apply a projection to a document, producing the projected copy
///
/// Inclusive mode (any included field present) keeps only the listed fields
/// plus `_id`; exclusive mode drops the listed fields. A `_id` exclusion
/// applies in either mode.
pub fn apply(doc: &Value, select: &Value) -> Value {
    let object = match doc.as_object() {
        Some(object) => object,
        None => return doc.clone(),
    };

    let (included, excluded) = partition(select);
    if included.is_empty() && excluded.is_empty() {
        return doc.clone();
    }

    let mut out = Map::new();
    if included.is_empty() {
        // exclusive mode
        for (key, value) in object {
            if !excluded.iter().any(|f| f == key) {
                out.insert(key.clone(), value.clone());
            }
        }
    } else {
        // inclusive mode: listed fields plus the identifier
        if let Some(id) = object.get(ID_FIELD) {
            out.insert(ID_FIELD.to_string(), id.clone());
        }
        for field in &included {
            if let Some(value) = object.get(field) {
                out.insert(field.clone(), value.clone());
            }
        }
        if excluded.iter().any(|f| f == ID_FIELD) {
            out.remove(ID_FIELD);
        }
    }
    Value::Object(out)
}

fn partition(select: &Value) -> (Vec<String>, Vec<String>) {
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    match select {
        Value::String(s) => {
            for tok in s.split_whitespace() {
                if let Some(field) = tok.strip_prefix('-') {
                    excluded.push(field.to_string());
                } else {
                    included.push(tok.to_string());
                }
            }
        }
        Value::Object(map) => {
            for (field, flag) in map {
                if is_zero(flag) {
                    excluded.push(field.clone());
                } else {
                    included.push(field.clone());
                }
            }
        }
        _ => {}
    }
    (included, excluded)
}

fn is_zero(v: &Value) -> bool {
    v.as_i64() == Some(0) || v.as_bool() == Some(false)
}
