//! SQLite row store
//!
//! Each table is `(id INTEGER PRIMARY KEY AUTOINCREMENT, doc TEXT)` where
//! `doc` is the row (minus `id`) as a JSON object. Filters and sorting run
//! inside SQLite through `json_extract`, so paging and counting never load
//! the whole table.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection as RusqliteConnection, OptionalExtension, params, params_from_iter};
use serde_json::Value;
use tabula_core::{
    Result, Row, RowId, RowPage, RowStore, SelectQuery, TabulaError, record_not_found,
};
use tabula_query::sql::{SqlRenderer, UNICODE_LOWER, quote_identifier};

const DOC_COLUMN: &str = "doc";

struct SqliteInner {
    conn: RusqliteConnection,
    known_tables: HashSet<String>,
}

/// SQLite-backed `RowStore`
pub struct SqliteStore {
    inner: Arc<Mutex<SqliteInner>>,
    renderer: SqlRenderer,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening SQLite store");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            return Err(TabulaError::Configuration(format!(
                "Parent directory does not exist: {}",
                parent.display()
            )));
        }

        let conn = RusqliteConnection::open(path).map_err(|e| {
            TabulaError::Backend(format!(
                "Failed to open SQLite database at '{}': {}",
                path.display(),
                e
            ))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| TabulaError::Backend(format!("Failed to set journal mode: {}", e)))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| TabulaError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = RusqliteConnection::open_in_memory().map_err(|e| {
            TabulaError::Backend(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: RusqliteConnection) -> Result<Self> {
        register_unicode_lower(&conn)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(SqliteInner {
                conn,
                known_tables: HashSet::new(),
            })),
            renderer: SqlRenderer::document(DOC_COLUMN).with_lower_function(UNICODE_LOWER),
        })
    }

    /// Run `f` against the connection on the blocking thread pool
    async fn with_conn<F, T>(&self, table: &str, f: F) -> Result<T>
    where
        F: FnOnce(&RusqliteConnection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let quoted = quote_identifier(table)?;
        let table = table.to_string();
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock();
            if !guard.known_tables.contains(&table) {
                guard
                    .conn
                    .execute_batch(&format!(
                        "CREATE TABLE IF NOT EXISTS {} (
                            id INTEGER PRIMARY KEY AUTOINCREMENT,
                            {} TEXT NOT NULL DEFAULT '{{}}'
                        )",
                        quoted, DOC_COLUMN
                    ))
                    .map_err(sql_error)?;
                guard.known_tables.insert(table);
            }
            f(&guard.conn, &quoted)
        })
        .await
        .map_err(|e| TabulaError::Backend(format!("SQLite task failed: {}", e)))?
    }
}

/// Lowercase text the way the in-memory evaluator does; NULL stays NULL
fn register_unicode_lower(conn: &RusqliteConnection) -> Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .map_err(|e| TabulaError::Backend(format!("Failed to register {}: {}", UNICODE_LOWER, e)))
}

#[async_trait]
impl RowStore for SqliteStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, query), fields(table = %query.table))]
    async fn select(&self, query: &SelectQuery) -> Result<RowPage> {
        let select = self.renderer.render_select(query)?;
        let count = self.renderer.render_count(query)?;
        tracing::debug!(sql = %select.sql, "selecting rows");

        self.with_conn(&query.table, move |conn, _| {
            let total_items: i64 = conn
                .query_row(
                    &count.sql,
                    params_from_iter(count.params.iter().map(to_sql_value)),
                    |row| row.get(0),
                )
                .map_err(sql_error)?;

            let mut stmt = conn.prepare(&select.sql).map_err(sql_error)?;
            let rows = stmt
                .query_map(
                    params_from_iter(select.params.iter().map(to_sql_value)),
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .map_err(sql_error)?
                .map(|r| r.map_err(sql_error).and_then(|(id, doc)| decode_row(id, &doc)))
                .collect::<Result<Vec<_>>>()?;

            Ok(RowPage {
                rows,
                total_items: total_items.max(0) as u64,
            })
        })
        .await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.with_conn(table, move |conn, quoted| insert_row(conn, quoted, row))
            .await
    }

    async fn update(&self, table: &str, id: &RowId, patch: Row) -> Result<Row> {
        let id = id.clone();
        self.with_conn(table, move |conn, quoted| {
            update_row(conn, quoted, &id, &patch)?.ok_or_else(|| record_not_found(&id))
        })
        .await
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        self.with_conn(table, move |conn, quoted| {
            let tx = conn.unchecked_transaction().map_err(sql_error)?;
            let mut stored = Vec::with_capacity(rows.len());
            for row in rows {
                let updated = match row.id() {
                    Some(id) => update_row(&tx, quoted, &id, &row)?,
                    None => None,
                };
                match updated {
                    Some(updated) => stored.push(updated),
                    None => stored.push(insert_row(&tx, quoted, row)?),
                }
            }
            tx.commit().map_err(sql_error)?;
            Ok(stored)
        })
        .await
    }

    async fn delete(&self, table: &str, ids: &[RowId]) -> Result<u64> {
        let ids: Vec<i64> = ids
            .iter()
            .filter_map(|id| id.as_str().parse::<i64>().ok())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_conn(table, move |conn, quoted| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let affected = conn
                .execute(
                    &format!("DELETE FROM {} WHERE id IN ({})", quoted, placeholders),
                    params_from_iter(ids.iter()),
                )
                .map_err(sql_error)?;
            tracing::debug!(affected_rows = affected, "rows deleted");
            Ok(affected as u64)
        })
        .await
    }
}

fn insert_row(conn: &RusqliteConnection, quoted: &str, mut row: Row) -> Result<Row> {
    let explicit_id = row.id();
    row.remove("id");
    row.remove("_id");
    let doc = serde_json::to_string(&row)?;

    let id = match explicit_id {
        Some(id) => {
            let id = id.as_str().parse::<i64>().map_err(|_| {
                TabulaError::validation(format!("Row id must be an integer, got '{}'", id))
            })?;
            conn.execute(
                &format!("INSERT INTO {} (id, {}) VALUES (?1, ?2)", quoted, DOC_COLUMN),
                params![id, doc],
            )
            .map_err(sql_error)?;
            id
        }
        None => {
            conn.execute(
                &format!("INSERT INTO {} ({}) VALUES (?1)", quoted, DOC_COLUMN),
                params![doc],
            )
            .map_err(sql_error)?;
            conn.last_insert_rowid()
        }
    };

    decode_row(id, &doc)
}

/// Apply a patch to a stored row. `Ok(None)` when the row does not exist.
fn update_row(
    conn: &RusqliteConnection,
    quoted: &str,
    id: &RowId,
    patch: &Row,
) -> Result<Option<Row>> {
    let Ok(id) = id.as_str().parse::<i64>() else {
        return Ok(None);
    };

    let doc: Option<String> = conn
        .query_row(
            &format!("SELECT {} FROM {} WHERE id = ?1", DOC_COLUMN, quoted),
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_error)?;
    let Some(doc) = doc else {
        return Ok(None);
    };

    let mut current = decode_row(id, &doc)?;
    current.apply_patch(patch);
    current.remove("id");
    let updated_doc = serde_json::to_string(&current)?;

    conn.execute(
        &format!("UPDATE {} SET {} = ?1 WHERE id = ?2", quoted, DOC_COLUMN),
        params![updated_doc, id],
    )
    .map_err(sql_error)?;

    decode_row(id, &updated_doc).map(Some)
}

fn decode_row(id: i64, doc: &str) -> Result<Row> {
    let value: Value = serde_json::from_str(doc)?;
    let mut row = Row::from_value(value).unwrap_or_default();
    row.insert("id", Value::from(id));
    Ok(row)
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_error(e: rusqlite::Error) -> TabulaError {
    TabulaError::Backend(format!("SQLite error: {}", e))
}
