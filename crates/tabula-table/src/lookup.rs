//! Populate lookups
//!
//! Foreign-key columns declare a lookup table and a label field. Resolved
//! options are kept here, keyed by column, so the column configuration stays
//! untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_core::{Result, RowStore, SelectQuery};
use tabula_query::eval::values_equal;

use crate::config::PopulateConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupOption {
    pub value: Value,
    pub label: String,
}

/// Lookup options per column accessor key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupResults {
    options: HashMap<String, Vec<LookupOption>>,
}

impl LookupResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, options: Vec<LookupOption>) {
        self.options.insert(column.into(), options);
    }

    pub fn get(&self, column: &str) -> Option<&[LookupOption]> {
        self.options.get(column).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Label for a foreign id, when the column has been resolved
    pub fn label_for(&self, column: &str, value: &Value) -> Option<&str> {
        self.options
            .get(column)?
            .iter()
            .find(|o| values_equal(&o.value, value))
            .map(|o| o.label.as_str())
    }
}

/// Fetch `{value: id, label: row[source]}` for every row of the lookup table
pub async fn load_options(store: &dyn RowStore, populate: &PopulateConfig) -> Result<Vec<LookupOption>> {
    let page = store.select(&SelectQuery::new(&populate.table)).await?;
    Ok(page
        .rows
        .iter()
        .filter_map(|row| {
            let value = row.id()?.to_value();
            let label = match row.get_path(&populate.source) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            Some(LookupOption { value, label })
        })
        .collect())
}
