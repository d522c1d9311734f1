//! Reference path declarations and target resolution

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use crate::query::{CacheDirective, CacheKey, SortSpec};

/// Execution options for one reference path
///
/// `limit` is a per-document budget: the consolidated lookup multiplies it
/// by the batch size. The cache directive makes the consolidated lookup
/// itself eligible for read-through caching.
#[derive(Debug, Clone, Default)]
pub struct PathOptions {
    pub sort: Option<SortSpec>,
    pub limit: Option<u64>,
    pub lean: bool,
    pub cache: CacheDirective,
}

/// A declared reference path: which field to resolve, against what, and how
#[derive(Debug, Clone)]
pub struct ReferencePath {
    /// Dotted field path holding the reference value(s)
    pub path: String,
    /// Explicit target collection, overriding declared references
    pub model: Option<String>,
    /// Extra match conditions merged into the consolidated lookup
    pub match_filter: Option<Value>,
    /// Projection for resolved documents
    pub select: Option<Value>,
    pub options: PathOptions,
}

impl ReferencePath {
    /// Declare a path with defaults
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            model: None,
            match_filter: None,
            select: None,
            options: PathOptions::default(),
        }
    }

    /// Override the target collection
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add match conditions for the consolidated lookup
    pub fn with_match(mut self, filter: Value) -> Self {
        self.match_filter = Some(filter);
        self
    }

    /// Project resolved documents
    pub fn with_select(mut self, select: Value) -> Self {
        self.select = Some(select);
        self
    }

    /// Sort the consolidated lookup (and with it, resolved arrays)
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.options.sort = Some(sort);
        self
    }

    /// Per-document result budget
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Resolve into lean records instead of validated documents
    pub fn lean(mut self) -> Self {
        self.options.lean = true;
        self
    }

    /// Cache the consolidated lookup
    pub fn with_cache(mut self, ttl_secs: Option<u64>, key: Option<CacheKey>) -> Self {
        self.options.cache = CacheDirective {
            enabled: Some(true),
            ttl_secs,
            key,
        };
        self
    }

    /// Resolve the target collection
    ///
    /// Order: explicit model override, then a declared reference from the
    /// resolver, then the owner collection itself. `None` means the target
    /// failed validation, a fatal configuration error for the path.
    pub(crate) fn resolve_target(
        &self,
        owner: &str,
        targets: &dyn ReferenceTargets,
    ) -> Option<String> {
        let resolved = self
            .model
            .clone()
            .or_else(|| targets.target(owner, &self.path))
            .unwrap_or_else(|| owner.to_string());
        if targets.is_known(&resolved) {
            Some(resolved)
        } else {
            None
        }
    }

    /// Serializable view used by the key generator
    pub(crate) fn key_view(&self) -> Value {
        json!({
            "path": self.path,
            "model": self.model,
            "match": self.match_filter,
            "select": self.select,
            "options": {
                "sort": self.options.sort,
                "limit": self.options.limit,
                "lean": self.options.lean,
            },
        })
    }
}

/// Schema-declared reference targets
///
/// The seam for the excluded document-mapper layer: it knows which
/// collection each reference field points at, and which collections exist
/// at all.
pub trait ReferenceTargets: Send + Sync {
    /// The declared target collection for a path on a model, if any
    fn target(&self, model: &str, path: &str) -> Option<String>;

    /// Whether a collection name is resolvable at all
    fn is_known(&self, _model: &str) -> bool {
        true
    }
}

/// Map-backed reference targets
///
/// With no registered collections every name is considered known, so
/// simple setups never hit configuration errors.
#[derive(Debug, Default)]
pub struct StaticTargets {
    refs: HashMap<(String, String), String>,
    collections: HashSet<String>,
}

impl StaticTargets {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `model.path` references `target`
    pub fn with_reference(
        mut self,
        model: impl Into<String>,
        path: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.refs
            .insert((model.into(), path.into()), target.into());
        self
    }

    /// Register a known collection, turning on target validation
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collections.insert(name.into());
        self
    }
}

impl ReferenceTargets for StaticTargets {
    fn target(&self, model: &str, path: &str) -> Option<String> {
        self.refs
            .get(&(model.to_string(), path.to_string()))
            .cloned()
    }

    fn is_known(&self, model: &str) -> bool {
        self.collections.is_empty() || self.collections.contains(model)
    }
}
