//! Reassignment of resolved documents into raw id trees
//!
//! Ordering rules:
//!
//! - Single-value fields follow findOne semantics: the matching document
//!   or null, never a raw id.
//! - Array fields with a requested sort place members at the consolidated
//!   result's own position; members with no result (and null leaves) are
//!   dropped.
//! - Array fields without a sort keep the caller's original order; members
//!   with no result are retained as their raw identifier, null leaves stay.
//! - Nested arrays recurse with the same rule per level; a level only
//!   sorts when it has more than one entry.
//!
//! The finishing pass then filters non-documents out of depth-1 arrays and
//! applies identifier exclusion; deeper levels are kept verbatim.

use std::collections::HashMap;

use serde_json::Value;

use crate::query::projection::ID_FIELD;

use super::raw_ids::{is_identifier_object, stringify_id, RawIds};

/// Lookup indexes built from the consolidated result set
pub(crate) struct AssignContext<'a> {
    pub docs_by_id: &'a HashMap<String, Value>,
    pub order_by_id: &'a HashMap<String, usize>,
    pub sort_requested: bool,
}

/// One reconciled slot, before the finishing pass
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Assigned {
    Null,
    /// An identifier that matched nothing
    Raw(Value),
    /// A resolved document
    Doc(Value),
    Many(Vec<Assigned>),
}

/// Reconcile one document's raw tree against the result indexes
pub(crate) fn assign_leaf(raw: &RawIds, ctx: &AssignContext<'_>) -> Assigned {
    match raw {
        RawIds::Many(items) => Assigned::Many(assign_array(items, ctx)),
        single => assign_single(single, ctx),
    }
}

fn assign_single(raw: &RawIds, ctx: &AssignContext<'_>) -> Assigned {
    match raw {
        RawIds::Id(id) => ctx
            .docs_by_id
            .get(&stringify_id(id))
            .cloned()
            .map(Assigned::Doc)
            .unwrap_or(Assigned::Null),
        _ => Assigned::Null,
    }
}

fn assign_array(items: &[RawIds], ctx: &AssignContext<'_>) -> Vec<Assigned> {
    let sorting = ctx.sort_requested && items.len() > 1;

    // Slot vector standing in for the original sparse-array reassignment:
    // pushes append, sorted matches land at their result-order position,
    // holes are compacted at the end.
    let mut slots: Vec<Option<Assigned>> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            RawIds::Many(inner) => {
                slots.push(Some(Assigned::Many(assign_array(inner, ctx))));
            }
            RawIds::Null | RawIds::Missing => {
                if !sorting {
                    slots.push(Some(Assigned::Null));
                }
            }
            RawIds::Id(id) => {
                let sid = stringify_id(id);
                match (ctx.docs_by_id.get(&sid), sorting) {
                    (Some(doc), true) => {
                        let pos = ctx.order_by_id[&sid];
                        if slots.len() <= pos {
                            slots.resize(pos + 1, None);
                        }
                        slots[pos] = Some(Assigned::Doc(doc.clone()));
                    }
                    (Some(doc), false) => slots.push(Some(Assigned::Doc(doc.clone()))),
                    // unmatched members drop under sort, stay raw otherwise
                    (None, true) => {}
                    (None, false) => slots.push(Some(Assigned::Raw(id.clone()))),
                }
            }
        }
    }
    slots.into_iter().flatten().collect()
}

/// Finishing pass: filter non-documents, apply identifier exclusion,
/// produce the value assigned onto the document's field
pub(crate) fn finish(assigned: Assigned, exclude_id: bool) -> Value {
    match assigned {
        Assigned::Many(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Assigned::Doc(mut doc) => {
                        if exclude_id {
                            remove_id(&mut doc);
                        }
                        out.push(doc);
                    }
                    // nested arrays pass the is-document predicate whole
                    Assigned::Many(inner) => out.push(verbatim(Assigned::Many(inner))),
                    Assigned::Raw(value) if is_document_value(&value) => {
                        let mut value = value;
                        if exclude_id {
                            remove_id(&mut value);
                        }
                        out.push(value);
                    }
                    // nulls and scalar identifiers filter out
                    _ => {}
                }
            }
            Value::Array(out)
        }
        Assigned::Doc(mut doc) => {
            if exclude_id {
                remove_id(&mut doc);
            }
            doc
        }
        Assigned::Null | Assigned::Raw(_) => Value::Null,
    }
}

/// Render a nested level without filtering
fn verbatim(assigned: Assigned) -> Value {
    match assigned {
        Assigned::Null => Value::Null,
        Assigned::Raw(value) | Assigned::Doc(value) => value,
        Assigned::Many(items) => Value::Array(items.into_iter().map(verbatim).collect()),
    }
}

/// The "is a document" predicate: excludes null, scalars, and opaque
/// identifier objects; arrays count as documents
fn is_document_value(value: &Value) -> bool {
    match value {
        Value::Object(_) => !is_identifier_object(value),
        Value::Array(_) => true,
        _ => false,
    }
}

fn remove_id(value: &mut Value) {
    if let Some(map) = value.as_object_mut() {
        map.remove(ID_FIELD);
    }
}
