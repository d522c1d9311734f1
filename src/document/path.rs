//! Dotted-path access into JSON documents

use serde_json::{Map, Value};

/// Read the value at a dotted path, if present
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write a value at a dotted path, creating intermediate objects
///
/// A non-object intermediate is replaced; writing into a non-object root is
/// a no-op.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    if !doc.is_object() {
        return;
    }
    let mut current = doc;
    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let map = match current.as_object_mut() {
            Some(map) => map,
            None => return,
        };
        if i == segments.len() - 1 {
            map.insert((*segment).to_string(), value);
            return;
        }
        let next = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !next.is_object() {
            *next = Value::Object(Map::new());
        }
        current = next;
    }
}
