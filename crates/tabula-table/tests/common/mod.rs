//! Common test utilities and mocks

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tabula_core::{Result, Row, RowId, RowPage, RowStore, SelectQuery, TabulaError};
use tabula_query::ColumnType;
use tabula_store::MemoryStore;
use tabula_table::{
    EditConfig, KanbanConfig, PaginationConfig, SearchConfig, SelectConfig, SelectMode,
    SelectOption, TableColumn, TableConfig,
};

/// Operation recorded by [`MockStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Select(SelectQuery),
    Insert(String),
    Update(String, RowId),
    Upsert(String, usize),
    Delete(String, Vec<RowId>),
}

/// Row store for orchestrator tests.
///
/// Reads and writes go to an in-memory store; failures and latency can be
/// injected per operation, and every call is logged for assertions.
pub struct MockStore {
    inner: MemoryStore,
    pub should_fail: bool,
    /// Updates and deletes against these ids fail
    pub failing_ids: HashSet<RowId>,
    pub latency: Option<Duration>,
    /// Log of every operation, in call order
    pub op_log: Arc<parking_lot::Mutex<Vec<StoreOp>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            should_fail: false,
            failing_ids: HashSet::new(),
            latency: None,
            op_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Value>) -> Self {
        self.inner = self
            .inner
            .with_rows(table, rows.into_iter().filter_map(Row::from_value));
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn with_failing_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.failing_ids.extend(ids.into_iter().map(RowId::from));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.op_log.lock().clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner.rows(table)
    }

    async fn enter(&self, op: StoreOp) -> Result<()> {
        self.op_log.lock().push(op);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.should_fail {
            return Err(TabulaError::Backend("mock store unavailable".into()));
        }
        Ok(())
    }

    fn check_id(&self, id: &RowId) -> Result<()> {
        if self.failing_ids.contains(id) {
            return Err(TabulaError::Backend(format!("update rejected for {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RowStore for MockStore {
    fn backend_name(&self) -> &str {
        "mock"
    }

    async fn select(&self, query: &SelectQuery) -> Result<RowPage> {
        self.enter(StoreOp::Select(query.clone())).await?;
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.enter(StoreOp::Insert(table.to_string())).await?;
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: &RowId, patch: Row) -> Result<Row> {
        self.enter(StoreOp::Update(table.to_string(), id.clone()))
            .await?;
        self.check_id(id)?;
        self.inner.update(table, id, patch).await
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        self.enter(StoreOp::Upsert(table.to_string(), rows.len()))
            .await?;
        for id in rows.iter().filter_map(Row::id) {
            self.check_id(&id)?;
        }
        self.inner.upsert(table, rows).await
    }

    async fn delete(&self, table: &str, ids: &[RowId]) -> Result<u64> {
        self.enter(StoreOp::Delete(table.to_string(), ids.to_vec()))
            .await?;
        for id in ids {
            self.check_id(id)?;
        }
        self.inner.delete(table, ids).await
    }
}

/// Users table: sortable, filterable, editable name/status/age columns
pub fn users_config() -> TableConfig {
    TableConfig {
        id: "user-table".into(),
        title: Some("Users".into()),
        endpoint: "users".into(),
        columns: vec![
            TableColumn::new("name", ColumnType::Text)
                .sortable()
                .filterable()
                .editable(),
            TableColumn::new("status", ColumnType::Text)
                .sortable()
                .filterable()
                .editable()
                .with_options(vec![
                    SelectOption::new("Active", "Active"),
                    SelectOption::new("Inactive", "Inactive"),
                ]),
            TableColumn::new("age", ColumnType::Number)
                .sortable()
                .filterable()
                .editable(),
            TableColumn::new("email", ColumnType::Email),
        ],
        search: Some(SearchConfig {
            enabled: true,
            placeholder: None,
            searchable_columns: vec!["name".into()],
        }),
        kanban: Some(KanbanConfig {
            enabled: true,
            identification: "id".into(),
            column_id_name: "name".into(),
            column_content: "status".into(),
            column_options: vec!["Active".into(), "Inactive".into(), "Suspended".into()],
        }),
        pagination: Some(PaginationConfig {
            enabled: true,
            page_size: 10,
            page_size_options: vec![5, 10, 20, 50],
        }),
        select: Some(SelectConfig {
            enabled: true,
            mode: SelectMode::Multiple,
        }),
        edit: Some(EditConfig {
            enabled: true,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Three users: two Active, one Inactive
pub fn three_users() -> Vec<Value> {
    vec![
        json!({"name": "Anna", "status": "Active", "age": 31, "email": "anna@example.com"}),
        json!({"name": "Bob", "status": "Inactive", "age": 45, "email": "bob@example.com"}),
        json!({"name": "Diana", "status": "Active", "age": 27, "email": "diana@example.com"}),
    ]
}

/// `n` users named `User 01` .. with ids 1..=n
pub fn numbered_users(n: usize) -> Vec<Value> {
    (1..=n)
        .map(|i| json!({"name": format!("User {:02}", i), "status": "Active", "age": 20 + i}))
        .collect()
}
