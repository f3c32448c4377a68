//! Backend-neutral query description
//!
//! A `SelectQuery` is what the table layer hands to a `RowStore`: a list of
//! predicates combined with AND, one sort key and an optional page range.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Row;

/// Ordering comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// Where the needle must appear in a case-insensitive text match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LikePattern {
    Contains,
    StartsWith,
    EndsWith,
}

impl LikePattern {
    /// Wrap an already-escaped needle in `%` wildcards
    pub fn wrap(&self, needle: &str) -> String {
        match self {
            Self::Contains => format!("%{}%", needle),
            Self::StartsWith => format!("{}%", needle),
            Self::EndsWith => format!("%{}", needle),
        }
    }
}

/// One backend-evaluable comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// Case-insensitive text match
    Like {
        column: String,
        pattern: LikePattern,
        needle: String,
        negated: bool,
    },
    /// Inclusive on both ends
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// Array column shares at least one element with `values`
    Overlaps { column: String, values: Vec<Value> },
    /// Array column holds every element of `values`
    ContainsAll { column: String, values: Vec<Value> },
    IsNull { column: String, negated: bool },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Self::Compare { column, .. }
            | Self::Like { column, .. }
            | Self::Between { column, .. }
            | Self::In { column, .. }
            | Self::Overlaps { column, .. }
            | Self::ContainsAll { column, .. }
            | Self::IsNull { column, .. } => column,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Like {
            column: column.into(),
            pattern: LikePattern::Contains,
            needle: needle.into(),
            negated: false,
        }
    }
}

/// Sort key; the default is `id` ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub ascending: bool,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, ascending: bool) -> Self {
        Self {
            column: column.into(),
            ascending,
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new("id", true)
    }
}

/// Page window: rows `[offset, offset + limit)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub offset: usize,
    pub limit: usize,
}

impl Range {
    /// Largest offset or limit any backend accepts (SQLite and MongoDB take `i64`)
    pub const MAX_WINDOW: usize = i64::MAX as usize;

    /// Window for a 1-based page number. Offsets past the end saturate, so an
    /// absurd page number reads an empty page.
    pub fn for_page(page: usize, page_size: usize) -> Self {
        Self::for_index(page.saturating_sub(1), page_size)
    }

    /// Window for a 0-based page index
    pub fn for_index(index: usize, page_size: usize) -> Self {
        Self {
            offset: index.saturating_mul(page_size).min(Self::MAX_WINDOW),
            limit: page_size.min(Self::MAX_WINDOW),
        }
    }
}

/// One paginated read against a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub table: String,
    pub predicates: Vec<Predicate>,
    pub sort: SortSpec,
    pub range: Option<Range>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

/// Rows of one page plus the number of matching rows across all pages
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowPage {
    pub rows: Vec<Row>,
    pub total_items: u64,
}
