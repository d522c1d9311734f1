//! Reference resolution
//!
//! One populate call per document batch: for every declared path, extract
//! the raw id tree across the batch, issue one consolidated lookup
//! (cache-aware, through the engine), and splice the results back into
//! each document's field shape. Lookups for all paths run concurrently;
//! the call completes when every path resolves or any one fails.

use std::collections::{HashMap, HashSet};

use futures_util::future::try_join_all;
use serde_json::{json, Map, Value};

use crate::document::path::{get_path, set_path};
use crate::document::Document;
use crate::engine::CacheEngine;
use crate::materialize::{MaterializeError, Record};
use crate::observability::{Logger, Severity};
use crate::query::{projection, Operation, QueryDescriptor};

use super::assign::{assign_leaf, finish, AssignContext};
use super::errors::{PopulateError, PopulateResult};
use super::path::ReferencePath;
use super::raw_ids::{stringify_id, RawIds};

/// A population target: a lean record or a hydrated document
///
/// Lean records carry no provenance, so prior-resolution reuse never
/// applies to them.
pub trait PopulateTarget: Send {
    /// Whether the target is a null placeholder rather than a document
    fn is_absent(&self) -> bool {
        false
    }

    /// Current value of a dotted-path field
    fn field_value(&self, path: &str) -> Option<Value>;

    /// Assign the reconciled value onto a field
    fn assign_field(&mut self, path: &str, value: Value);

    /// Ids recorded by a prior resolution of the path, when reusable
    fn prior_ids(&self, _path: &str) -> Option<Value> {
        None
    }

    /// Record resolved ids for future reuse
    fn record_ids(&mut self, _path: &str, _ids: &Value, _model: &str) {}
}

impl PopulateTarget for Value {
    fn is_absent(&self) -> bool {
        self.is_null()
    }

    fn field_value(&self, path: &str) -> Option<Value> {
        get_path(self, path).cloned()
    }

    fn assign_field(&mut self, path: &str, value: Value) {
        set_path(self, path, value);
    }
}

impl PopulateTarget for Document {
    fn field_value(&self, path: &str) -> Option<Value> {
        self.get(path).cloned()
    }

    fn assign_field(&mut self, path: &str, value: Value) {
        self.assign_raw(path, value);
    }

    fn prior_ids(&self, path: &str) -> Option<Value> {
        if self.is_modified(path) {
            return None;
        }
        self.populated(path).map(|entry| entry.ids.clone())
    }

    fn record_ids(&mut self, path: &str, ids: &Value, model: &str) {
        self.set_populated(path, ids.clone(), model);
    }
}

impl PopulateTarget for Record {
    fn is_absent(&self) -> bool {
        match self {
            Record::Lean(value) => value.is_absent(),
            Record::Document(_) => false,
        }
    }

    fn field_value(&self, path: &str) -> Option<Value> {
        match self {
            Record::Lean(value) => value.field_value(path),
            Record::Document(doc) => doc.field_value(path),
        }
    }

    fn assign_field(&mut self, path: &str, value: Value) {
        match self {
            Record::Lean(target) => target.assign_field(path, value),
            Record::Document(doc) => doc.assign_field(path, value),
        }
    }

    fn prior_ids(&self, path: &str) -> Option<Value> {
        match self {
            Record::Lean(_) => None,
            Record::Document(doc) => doc.prior_ids(path),
        }
    }

    fn record_ids(&mut self, path: &str, ids: &Value, model: &str) {
        if let Record::Document(doc) = self {
            doc.record_ids(path, ids, model);
        }
    }
}

/// Per-path execution plan built during extraction
struct PathPlan {
    field_path: String,
    raw: Vec<RawIds>,
    /// `None` when the path resolved to a no-op (nothing to look up)
    descriptor: Option<QueryDescriptor>,
    exclude_id: bool,
    sort_requested: bool,
    lean: bool,
}

/// Resolves reference paths across a document batch
pub struct ReferenceResolver<'a> {
    engine: &'a CacheEngine,
}

impl<'a> ReferenceResolver<'a> {
    /// Create a resolver bound to an engine
    pub fn new(engine: &'a CacheEngine) -> Self {
        Self { engine }
    }

    /// Resolve every declared path over the batch
    pub async fn populate<T: PopulateTarget>(
        &self,
        model: &str,
        docs: &mut [T],
        paths: &[ReferencePath],
    ) -> PopulateResult<()> {
        if paths.is_empty() || docs.is_empty() || docs.iter().all(PopulateTarget::is_absent) {
            return Ok(());
        }

        let mut plans = Vec::with_capacity(paths.len());
        for path in paths {
            plans.push(self.prepare(model, docs, path)?);
        }

        let results = try_join_all(plans.iter().map(|plan| self.lookup(plan))).await?;

        for (plan, rows) in plans.iter().zip(results) {
            if let Some(rows) = rows {
                reconcile(docs, plan, rows)?;
            }
        }
        Ok(())
    }

    /// Extraction: raw id tree per document, consolidated descriptor
    fn prepare<T: PopulateTarget>(
        &self,
        model: &str,
        docs: &mut [T],
        path: &ReferencePath,
    ) -> PopulateResult<PathPlan> {
        let target = path
            .resolve_target(model, self.engine.reference_targets().as_ref())
            .ok_or_else(|| PopulateError::Configuration {
                model: model.to_string(),
                path: path.path.clone(),
            })?;

        let mut raw = Vec::with_capacity(docs.len());
        for doc in docs.iter_mut() {
            let mut leaf = match self.reusable_ids(doc, path) {
                Some(ids) => RawIds::from_value(Some(ids)),
                None => RawIds::Missing,
            };
            if leaf.is_empty_like() {
                leaf = RawIds::from_value(doc.field_value(&path.path));
            }
            if !matches!(leaf, RawIds::Missing | RawIds::Null) {
                doc.record_ids(&path.path, &leaf.to_value(), &target);
            }
            raw.push(leaf);
        }

        // one deduplicated id set for the whole batch, nulls excluded
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for leaf in &raw {
            leaf.collect_ids(&mut |id| {
                if seen.insert(stringify_id(id)) {
                    ids.push(id.clone());
                }
            });
        }
        if ids.is_empty() {
            return Ok(PathPlan {
                field_path: path.path.clone(),
                raw,
                descriptor: None,
                exclude_id: false,
                sort_requested: false,
                lean: path.options.lean,
            });
        }

        // caller match merged with id membership, unless it already
        // constrains the identifier
        let mut conditions = match path.match_filter.as_ref().and_then(Value::as_object) {
            Some(map) => map.clone(),
            None => Map::new(),
        };
        conditions
            .entry(projection::ID_FIELD.to_string())
            .or_insert_with(|| json!({ "$in": ids }));

        // identifier exclusion is neutralized on the wire and re-applied
        // during reassignment
        let exclude_id = path
            .select
            .as_ref()
            .map(projection::excludes_id)
            .unwrap_or(false);
        let fields = path.select.as_ref().map(|select| {
            if exclude_id {
                projection::strip_id_exclusion(select)
            } else {
                select.clone()
            }
        });

        let mut descriptor =
            QueryDescriptor::new(target, Operation::Find, Value::Object(conditions));
        descriptor.fields = fields;
        descriptor.options.sort = path.options.sort.clone();
        // the limit is a per-document budget, not an aggregate one
        descriptor.options.limit = path.options.limit.map(|limit| limit * docs.len() as u64);
        descriptor.options.lean = path.options.lean;
        descriptor.cache = path.options.cache.clone();

        Ok(PathPlan {
            field_path: path.path.clone(),
            raw,
            descriptor: Some(descriptor),
            exclude_id,
            sort_requested: path.options.sort.is_some(),
            lean: path.options.lean,
        })
    }

    /// Prior ids are reusable only for an unmodified hydrated path whose
    /// recorded count still matches an array field's element count
    fn reusable_ids<T: PopulateTarget>(&self, doc: &T, path: &ReferencePath) -> Option<Value> {
        let prior = doc.prior_ids(&path.path)?;
        if let (Some(prior_items), Some(current)) =
            (prior.as_array(), doc.field_value(&path.path))
        {
            if let Some(current_items) = current.as_array() {
                if prior_items.len() != current_items.len() {
                    return None;
                }
            }
        }
        self.engine.metrics().record_populate_reuse();
        Some(prior)
    }

    /// The consolidated lookup, read-through cached when the path asks
    async fn lookup(&self, plan: &PathPlan) -> PopulateResult<Option<Vec<Value>>> {
        let descriptor = match &plan.descriptor {
            Some(descriptor) => descriptor,
            None => return Ok(None),
        };
        self.engine.metrics().record_populate_lookup();
        Logger::log(
            Severity::Debug,
            "populate_lookup",
            &[
                ("collection", descriptor.collection.as_str()),
                ("path", plan.field_path.as_str()),
            ],
        );
        let rows = self
            .engine
            .fetch_find(descriptor)
            .await
            .map_err(|err| PopulateError::Lookup(Box::new(err)))?;
        Ok(Some(rows))
    }
}

/// Splice resolved rows back into every document's field shape
fn reconcile<T: PopulateTarget>(
    docs: &mut [T],
    plan: &PathPlan,
    rows: Vec<Value>,
) -> PopulateResult<()> {
    if !plan.lean {
        // matched rows must hydrate; one bad row fails the whole path
        for row in &rows {
            if !row.is_object() {
                return Err(PopulateError::Materialize(MaterializeError::NotADocument(
                    row.to_string(),
                )));
            }
        }
    }

    let mut docs_by_id = HashMap::new();
    let mut order_by_id = HashMap::new();
    for (position, row) in rows.iter().enumerate() {
        let sid = stringify_id(row.get(projection::ID_FIELD).unwrap_or(&Value::Null));
        docs_by_id.insert(sid.clone(), row.clone());
        order_by_id.insert(sid, position);
    }

    let ctx = AssignContext {
        docs_by_id: &docs_by_id,
        order_by_id: &order_by_id,
        sort_requested: plan.sort_requested,
    };

    for (doc, raw) in docs.iter_mut().zip(&plan.raw) {
        if doc.is_absent() {
            continue;
        }
        let assigned = assign_leaf(raw, &ctx);
        doc.assign_field(&plan.field_path, finish(assigned, plan.exclude_id));
    }
    Ok(())
}
