//! Row store trait
//!
//! Every backend (in-memory, SQLite, MongoDB) implements `RowStore`. The
//! table orchestrator, the page repository and the HTTP handlers only ever
//! see `Arc<dyn RowStore>`, so tests swap in fakes freely.

use async_trait::async_trait;

use crate::{Predicate, Result, Row, RowId, RowPage, SelectQuery, TabulaError};

/// A generic per-table backend client
///
/// Writes are independent and non-transactional: concurrent editors of the
/// same row resolve as last write wins.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Backend identifier (e.g. "memory", "sqlite", "mongodb")
    fn backend_name(&self) -> &str;

    /// Run a filtered, sorted, paginated read.
    ///
    /// `RowPage::total_items` counts every matching row, ignoring the range.
    async fn select(&self, query: &SelectQuery) -> Result<RowPage>;

    /// Insert a row and return it as stored. The backend assigns `id` when absent.
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Apply a patch to an existing row (see `Row::apply_patch`) and return
    /// the updated row. A missing row yields `TabulaError::NotFound`.
    async fn update(&self, table: &str, id: &RowId, patch: Row) -> Result<Row>;

    /// Update-or-insert each row by its id; rows without an id are inserted.
    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Delete rows by id, returning how many were removed
    async fn delete(&self, table: &str, ids: &[RowId]) -> Result<u64>;

    /// Fetch one row by id
    async fn get(&self, table: &str, id: &RowId) -> Result<Option<Row>> {
        let query = SelectQuery::new(table).filter(Predicate::eq("id", id.to_value()));
        let page = self.select(&query).await?;
        Ok(page.rows.into_iter().next())
    }
}

/// Error for an update that targets a row which does not exist
pub fn record_not_found(id: &RowId) -> TabulaError {
    TabulaError::NotFound(format!("Record with ID {} not found", id))
}
