//! Condition matching for the in-memory source
//!
//! Strict matching, no type coercion: a string never equals a number. A
//! condition object combines field tests with AND semantics; a field test
//! is either a direct value or an operator object (`$in`, `$ne`, `$gt`,
//! `$gte`, `$lt`, `$lte`, `$exists`).

use serde_json::{Map, Value};

use crate::document::path::get_path;

/// Whether a document matches a condition object
///
/// Non-object conditions match everything.
pub fn matches(doc: &Value, conditions: &Value) -> bool {
    let map = match conditions.as_object() {
        Some(map) => map,
        None => return true,
    };
    map.iter()
        .all(|(field, expected)| matches_field(get_path(doc, field), expected))
}

fn matches_field(actual: Option<&Value>, expected: &Value) -> bool {
    if let Some(ops) = operator_object(expected) {
        return ops.iter().all(|(op, operand)| apply_operator(actual, op, operand));
    }

    let actual = match actual {
        Some(v) if !v.is_null() => v,
        // missing or null fields only match operator tests
        _ => return false,
    };

    // direct equality, plus array-contains for array-valued fields
    if actual == expected {
        return true;
    }
    matches!(actual, Value::Array(items) if items.contains(expected))
}

fn operator_object(v: &Value) -> Option<&Map<String, Value>> {
    let map = v.as_object()?;
    if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) {
        Some(map)
    } else {
        None
    }
}

fn apply_operator(actual: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$exists" => {
            let wanted = operand.as_bool().unwrap_or(true);
            actual.is_some() == wanted
        }
        "$ne" => actual != Some(operand),
        _ => {
            let actual = match actual {
                Some(v) if !v.is_null() => v,
                _ => return false,
            };
            match op {
                "$in" => match operand.as_array() {
                    Some(candidates) => match actual {
                        Value::Array(items) => items.iter().any(|i| candidates.contains(i)),
                        scalar => candidates.contains(scalar),
                    },
                    None => false,
                },
                "$gt" => compare_numbers_or_strings(actual, operand, |o| o.is_gt()),
                "$gte" => compare_numbers_or_strings(actual, operand, |o| o.is_ge()),
                "$lt" => compare_numbers_or_strings(actual, operand, |o| o.is_lt()),
                "$lte" => compare_numbers_or_strings(actual, operand, |o| o.is_le()),
                // unknown operators never match
                _ => false,
            }
        }
    }
}

fn compare_numbers_or_strings(
    actual: &Value,
    bound: &Value,
    check: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(af), Some(bf)) => af.partial_cmp(&bf).map(&check).unwrap_or(false),
            _ => false,
        },
        (Value::String(a), Value::String(b)) => check(a.as_str().cmp(b.as_str())),
        _ => false,
    }
}
