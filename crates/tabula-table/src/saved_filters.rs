//! Named filter presets
//!
//! A saved filter stores a table's filter list and sorting for one user in the
//! `Filters` table of any [`RowStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_core::{Predicate, Result, Row, RowId, RowStore, SelectQuery, SortSpec, TabulaError};
use tabula_query::FilterValue;

use crate::orchestrator::TableOrchestrator;
use crate::state::SortingState;

pub const FILTERS_TABLE: &str = "Filters";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    pub name: String,
    #[serde(default, deserialize_with = "json_or_string")]
    pub filters: Vec<FilterValue>,
    #[serde(default, deserialize_with = "json_or_string")]
    pub sorting: SortingState,
    pub table_name: String,
    pub created_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl SavedFilter {
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        created_by: impl Into<String>,
        filters: Vec<FilterValue>,
        sorting: SortingState,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            filters,
            sorting,
            table_name: table_name.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }

    fn from_row(row: Row) -> Result<Self> {
        let mut saved: Self = serde_json::from_value(row.into_value())?;
        if saved.id.is_none() {
            return Err(TabulaError::backend("saved filter without id"));
        }
        saved.filters.retain(|f| !f.column.is_empty());
        Ok(saved)
    }
}

/// Some backends keep the filter list as a JSON string column
fn json_or_string<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    let value = match value {
        Value::Null => return Ok(T::default()),
        Value::String(s) if s.trim().is_empty() => return Ok(T::default()),
        Value::String(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom)?,
        other => other,
    };
    serde_json::from_value(value).map_err(serde::de::Error::custom)
}

#[derive(Clone)]
pub struct SavedFilterRepository {
    store: Arc<dyn RowStore>,
}

impl SavedFilterRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, filter), fields(name = %filter.name, table = %filter.table_name))]
    pub async fn save(&self, filter: SavedFilter) -> Result<SavedFilter> {
        if filter.name.trim().is_empty() {
            return Err(TabulaError::validation("Please enter a filter name"));
        }
        if filter.filters.is_empty() {
            return Err(TabulaError::validation("Please add at least one filter"));
        }

        let mut value = serde_json::to_value(&filter)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("id");
        }
        let row = Row::from_value(value)
            .ok_or_else(|| TabulaError::validation("saved filter must be an object"))?;
        let stored = self.store.insert(FILTERS_TABLE, row).await?;
        tracing::info!("saved filter stored");
        SavedFilter::from_row(stored)
    }

    /// Presets for one table and user, newest first
    pub async fn list(&self, table_name: &str, created_by: &str) -> Result<Vec<SavedFilter>> {
        let query = SelectQuery::new(FILTERS_TABLE)
            .filter(Predicate::eq("tableName", table_name))
            .filter(Predicate::eq("createdBy", created_by))
            .sort(SortSpec::new("createdAt", false));
        let page = self.store.select(&query).await?;

        let mut filters = Vec::with_capacity(page.rows.len());
        for row in page.rows {
            match SavedFilter::from_row(row) {
                Ok(saved) => filters.push(saved),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable saved filter"),
            }
        }
        filters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(filters)
    }

    pub async fn get(&self, id: &RowId) -> Result<SavedFilter> {
        let row = self
            .store
            .get(FILTERS_TABLE, id)
            .await?
            .ok_or_else(|| TabulaError::not_found(format!("Saved filter {} not found", id)))?;
        SavedFilter::from_row(row)
    }

    pub async fn delete(&self, id: &RowId) -> Result<()> {
        let deleted = self.store.delete(FILTERS_TABLE, std::slice::from_ref(id)).await?;
        if deleted == 0 {
            return Err(TabulaError::not_found(format!("Saved filter {} not found", id)));
        }
        Ok(())
    }

    /// Load a preset into a table and refetch
    pub async fn apply(&self, saved: &SavedFilter, table: &mut TableOrchestrator) -> Result<()> {
        table
            .apply_saved_filter(saved.filters.clone(), saved.sorting.clone())
            .await
    }
}
