//! In-memory row store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tabula_core::{
    Result, Row, RowId, RowPage, RowStore, SelectQuery, TabulaError, record_not_found,
};
use tabula_query::eval;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Row>,
    next_id: i64,
}

impl MemoryTable {
    fn position(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id().as_ref() == Some(id))
    }

    fn insert(&mut self, mut row: Row) -> Result<Row> {
        match row.id() {
            Some(id) => {
                if self.position(&id).is_some() {
                    return Err(TabulaError::Conflict(format!(
                        "Record with ID {} already exists",
                        id
                    )));
                }
                if let Ok(n) = id.as_str().parse::<i64>() {
                    self.next_id = self.next_id.max(n);
                }
            }
            None => {
                self.next_id += 1;
                row.insert("id", Value::from(self.next_id));
            }
        }
        self.rows.push(row.clone());
        Ok(row)
    }
}

/// Tables held in process memory. Ids are assigned from a per-table counter.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with rows, assigning ids where missing
    pub fn with_rows(self, table: &str, rows: impl IntoIterator<Item = Row>) -> Self {
        {
            let mut tables = self.tables.write();
            let entry = tables.entry(table.to_string()).or_default();
            for row in rows {
                if let Err(e) = entry.insert(row) {
                    tracing::warn!(table = %table, error = %e, "skipping seed row");
                }
            }
        }
        self
    }

    /// Snapshot of a table, in insertion order
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn select(&self, query: &SelectQuery) -> Result<RowPage> {
        let mut matching: Vec<Row> = {
            let tables = self.tables.read();
            tables
                .get(&query.table)
                .map(|t| {
                    t.rows
                        .iter()
                        .filter(|row| eval::matches(row, &query.predicates))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        eval::sort_rows(&mut matching, &query.sort);
        let total_items = matching.len() as u64;

        let rows = match query.range {
            Some(range) => matching
                .into_iter()
                .skip(range.offset)
                .take(range.limit)
                .collect(),
            None => matching,
        };

        tracing::debug!(table = %query.table, rows = rows.len(), total_items, "memory select");
        Ok(RowPage { rows, total_items })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(row)
    }

    async fn update(&self, table: &str, id: &RowId, patch: Row) -> Result<Row> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(table).ok_or_else(|| record_not_found(id))?;
        let index = table.position(id).ok_or_else(|| record_not_found(id))?;
        let row = &mut table.rows[index];
        row.apply_patch(&patch);
        Ok(row.clone())
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut tables = self.tables.write();
        let table = tables.entry(table.to_string()).or_default();

        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let existing = row.id().and_then(|id| table.position(&id));
            match existing {
                Some(index) => {
                    let target = &mut table.rows[index];
                    target.apply_patch(&row);
                    stored.push(target.clone());
                }
                None => stored.push(table.insert(row)?),
            }
        }
        Ok(stored)
    }

    async fn delete(&self, table: &str, ids: &[RowId]) -> Result<u64> {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table
            .rows
            .retain(|row| row.id().is_none_or(|id| !ids.contains(&id)));
        Ok((before - table.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabula_core::{Predicate, Range, SortSpec};

    fn row(value: Value) -> Row {
        Row::from_value(value).unwrap()
    }

    fn people() -> MemoryStore {
        MemoryStore::new().with_rows(
            "people",
            ["Anna", "Bob", "Diana"]
                .into_iter()
                .map(|name| row(json!({ "name": name }))),
        )
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let store = people();
        let rows = store.rows("people");
        let ids: Vec<_> = rows.iter().map(|r| r.id().unwrap()).collect();
        assert_eq!(ids, vec![RowId::from(1), RowId::from(2), RowId::from(3)]);

        let inserted = store.insert("people", row(json!({"name": "Eve"}))).await.unwrap();
        assert_eq!(inserted.id(), Some(RowId::from(4)));
    }

    #[tokio::test]
    async fn test_select_filters_sorts_and_pages() {
        let store = people();
        let query = SelectQuery::new("people")
            .filter(Predicate::contains("name", "an"))
            .sort(SortSpec::new("name", false))
            .range(Range { offset: 0, limit: 1 });

        let page = store.select(&query).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].get("name"), Some(&json!("Diana")));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = people();
        let err = store
            .update("people", &RowId::from(42), row(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Record with ID 42 not found");
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let store = people();
        let stored = store
            .upsert(
                "people",
                vec![row(json!({"id": 2, "name": "Robert"})), row(json!({"name": "Zed"}))],
            )
            .await
            .unwrap();
        assert_eq!(stored[0].get("name"), Some(&json!("Robert")));
        assert_eq!(stored[1].id(), Some(RowId::from(4)));

        let removed = store
            .delete("people", &[RowId::from(1), RowId::from(4), RowId::from(99)])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.rows("people").len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_a_conflict() {
        let store = people();
        let err = store
            .insert("people", row(json!({"id": 1, "name": "Again"})))
            .await
            .unwrap_err();
        assert!(matches!(err, TabulaError::Conflict(_)));
    }
}
