//! Execution options attached to a query

use serde::Serialize;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

/// Sort specification: a single field plus direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    /// Ascending sort on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending sort on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Per-query execution options
///
/// `lean` selects plain-record materialization; everything else shapes the
/// result set the data source returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryOptions {
    pub sort: Option<SortSpec>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    /// Excluded from key serialization: lean and hydrated reads of the same
    /// query share one stored raw value and diverge at materialization time
    #[serde(skip)]
    pub lean: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_spec_constructors() {
        let spec = SortSpec::asc("age");
        assert_eq!(spec.field, "age");
        assert_eq!(spec.order, SortOrder::Asc);

        let spec = SortSpec::desc("name");
        assert_eq!(spec.order, SortOrder::Desc);
    }

    #[test]
    fn test_options_default_is_not_lean() {
        let opts = QueryOptions::default();
        assert!(!opts.lean);
        assert!(opts.sort.is_none());
        assert!(opts.limit.is_none());
    }

    #[test]
    fn test_sort_serializes_compactly() {
        let spec = SortSpec::asc("num");
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"field":"num","order":"asc"}"#);
    }
}
