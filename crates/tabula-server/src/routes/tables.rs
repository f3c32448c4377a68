//! Generic row endpoints for every configured table

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tabula_core::{Row, RowId, TabulaError};
use tabula_interchange::{CsvImporter, ExportFormat};
use tabula_query::PredicateTranslator;
use tabula_table::{
    FetchRequest, KanbanConfig, TableConfig, TablePage, load_board, load_options, persist_move,
    validate_cell,
};

use super::respond;
use crate::error::ApiError;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tables/{table}/query", post(query_rows))
        .route("/api/tables/{table}/rows", post(insert_row).put(update_row))
        .route("/api/tables/{table}/rows/{id}", delete(delete_row))
        .route("/api/tables/{table}/bulk-update", post(bulk_update))
        .route("/api/tables/{table}/bulk-delete", post(bulk_delete))
        .route("/api/tables/{table}/lookup/{column}", get(lookup))
        .route("/api/tables/{table}/kanban", get(kanban_board))
        .route("/api/tables/{table}/kanban/move", post(kanban_move))
        .route("/api/tables/{table}/export", get(export))
        .route("/api/tables/{table}/import", post(import))
}

/// Split a request body into the target id and the remaining fields
fn split_id(body: Value) -> Result<(RowId, Row), ApiError> {
    let mut row =
        Row::from_value(body).ok_or_else(|| ApiError::bad_request("Request body must be an object"))?;
    let id = ["id", "_id"]
        .into_iter()
        .filter_map(|key| row.remove(key))
        .find_map(|value| RowId::from_value(&value))
        .ok_or_else(|| ApiError::bad_request("No ID provided for update"))?;
    Ok((id, row))
}

/// Coerce the values of known columns; unknown fields pass through untouched
fn validate_row(config: &TableConfig, row: Row) -> Result<Row, ApiError> {
    let mut validated = Row::new();
    for (key, value) in row.into_map() {
        let value = match config.column(&key) {
            Some(column) if !value.is_null() => {
                validate_cell(column, value).map_err(TabulaError::from)?
            }
            _ => value,
        };
        validated.insert(key, value);
    }
    Ok(validated)
}

fn kanban_config(config: &TableConfig) -> Result<&KanbanConfig, ApiError> {
    config
        .kanban
        .as_ref()
        .filter(|k| k.enabled)
        .ok_or_else(|| ApiError::bad_request("Kanban view is not enabled for this table"))
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn query_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let Json(body) = payload?;
    let has_pagination = body.get("pagination").is_some();
    let mut request: FetchRequest =
        serde_json::from_value(body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !has_pagination {
        request.pagination.page_size = match config.pagination {
            Some(_) => config.page_size(),
            None => state.settings.default_page_size,
        };
    }

    let (query, translation) = request
        .to_query(config.table_name(), &PredicateTranslator::new())
        .map_err(TabulaError::from)?;
    for skipped in &translation.skipped {
        tracing::debug!(column = %skipped.column, reason = ?skipped.reason, "filter skipped");
    }

    let rows = state.store.select(&query).await?;
    let page = TablePage::from_rows(rows, &request.pagination);
    Ok(respond(
        Some("Data fetched successfully"),
        json!({ "data": page }),
    ))
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn insert_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let Json(body) = payload?;
    let row =
        Row::from_value(body).ok_or_else(|| ApiError::bad_request("Request body must be an object"))?;
    let row = validate_row(&config, row)?;
    let stored = state.store.insert(config.table_name(), row).await?;
    Ok(respond(
        Some("Record added successfully"),
        json!({ "data": stored }),
    ))
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn update_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let Json(body) = payload?;
    let (id, patch) = split_id(body)?;
    let patch = validate_row(&config, patch)?;
    let stored = state.store.update(config.table_name(), &id, patch).await?;
    Ok(respond(
        Some("Record updated successfully"),
        json!({ "data": stored }),
    ))
}

#[tracing::instrument(skip_all, fields(table = %table, id = %id))]
async fn delete_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let id = RowId::new(id);
    let deleted = state
        .store
        .delete(config.table_name(), std::slice::from_ref(&id))
        .await?;
    if deleted == 0 {
        return Err(tabula_core::record_not_found(&id).into());
    }
    Ok(respond(Some("Record deleted successfully"), Value::Null))
}

/// Patch many rows, at most `commit_concurrency` writes in flight.
/// Failures are reported per row in request order.
#[tracing::instrument(skip_all, fields(table = %table))]
async fn bulk_update(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let Json(items) = payload?;

    let mut patches = Vec::with_capacity(items.len());
    for item in items {
        let (id, patch) = split_id(item)?;
        patches.push((id, validate_row(&config, patch)?));
    }

    let store = state.store.clone();
    let table_name: Arc<str> = Arc::from(config.table_name());
    let outcomes: Vec<(RowId, Result<Row, TabulaError>)> = futures::stream::iter(patches)
        .map(|(id, patch)| {
            let store = store.clone();
            let table_name = table_name.clone();
            async move {
                let result = store.update(&table_name, &id, patch).await;
                (id, result)
            }
        })
        .buffered(state.settings.commit_concurrency.max(1))
        .collect()
        .await;

    let mut updated = Vec::new();
    let mut failed = Vec::new();
    for (id, result) in outcomes {
        match result {
            Ok(row) => updated.push(row),
            Err(e) => {
                tracing::warn!(%id, error = %e, "bulk update failed for row");
                failed.push(json!({ "id": id, "message": e.user_message() }));
            }
        }
    }

    let message = if failed.is_empty() {
        format!("Updated {} records", updated.len())
    } else {
        format!("Updated {} records, {} failed", updated.len(), failed.len())
    };
    Ok(respond(
        Some(&message),
        json!({ "data": { "updated": updated, "failed": failed } }),
    ))
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    #[serde(default)]
    ids: Vec<Value>,
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn bulk_delete(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let Json(request) = payload?;
    let ids: Vec<RowId> = request.ids.iter().filter_map(RowId::from_value).collect();
    if ids.is_empty() {
        return Err(ApiError::bad_request("No IDs provided for delete"));
    }
    let deleted = state.store.delete(config.table_name(), &ids).await?;
    Ok(respond(
        Some(&format!("Deleted {} records", deleted)),
        json!({ "data": { "deleted": deleted } }),
    ))
}

#[tracing::instrument(skip_all, fields(table = %table, column = %column))]
async fn lookup(
    State(state): State<AppState>,
    Path((table, column)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let populate = config
        .column(&column)
        .ok_or_else(|| ApiError::not_found(format!("Column {} not found", column)))?
        .populate
        .as_ref()
        .ok_or_else(|| ApiError::bad_request(format!("Column {} has no lookup", column)))?;
    let options = load_options(state.store.as_ref(), populate).await?;
    Ok(respond(None, json!({ "data": options })))
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn kanban_board(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let kanban = kanban_config(&config)?;
    let board = load_board(state.store.as_ref(), config.table_name(), kanban).await?;
    Ok(respond(None, json!({ "data": board })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    id: Value,
    column_id: String,
    #[serde(default)]
    position: Option<usize>,
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn kanban_move(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let kanban = kanban_config(&config)?;
    let Json(request) = payload?;
    let card_id = RowId::from_value(&request.id)
        .ok_or_else(|| ApiError::bad_request("No ID provided for update"))?;

    let mut board = load_board(state.store.as_ref(), config.table_name(), kanban).await?;
    let change = board
        .move_card(
            card_id.as_str(),
            &request.column_id,
            request.position.unwrap_or(usize::MAX),
        )
        .map_err(TabulaError::from)?;

    match change {
        Some(change) => {
            let row =
                persist_move(state.store.as_ref(), config.table_name(), kanban, &change).await?;
            Ok(respond(
                Some("Record updated successfully"),
                json!({ "data": row }),
            ))
        }
        None => Ok(respond(Some("Card already in column"), Value::Null)),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn export(
    State(state): State<AppState>,
    Path(table): Path<String>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let config = state.table(&table)?;
    let Query(query) = query?;
    let format = match query.format.as_deref() {
        Some(format) => format.parse::<ExportFormat>().map_err(TabulaError::from)?,
        None => ExportFormat::Csv,
    };

    let file = state
        .exporter
        .export_table(state.store.as_ref(), &config, format)
        .await
        .map_err(TabulaError::from)?;

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, file.content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest {
    file_name: String,
    content: String,
}

#[tracing::instrument(skip_all, fields(table = %table))]
async fn import(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let config = state.table(&table)?;
    let Json(request) = payload?;
    let report = CsvImporter::new(state.store.clone(), config)
        .import(&request.file_name, &request.content)
        .await
        .map_err(TabulaError::from)?;

    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|(line, message)| json!({ "line": line, "message": message }))
        .collect();
    Ok(respond(
        Some(&format!("Imported {} records", report.inserted)),
        json!({ "data": { "inserted": report.inserted, "failed": failed } }),
    ))
}
