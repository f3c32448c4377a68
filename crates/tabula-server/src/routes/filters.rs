use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tabula_core::RowId;
use tabula_table::SavedFilter;

use super::respond;
use crate::error::ApiError;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/filters", get(list_filters).post(save_filter))
        .route("/api/filters/{id}", delete(delete_filter))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterQuery {
    table_name: String,
    created_by: String,
}

#[tracing::instrument(skip_all)]
async fn list_filters(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let filters = state
        .saved_filters
        .list(&query.table_name, &query.created_by)
        .await?;
    Ok(respond(None, json!({ "data": filters })))
}

#[tracing::instrument(skip_all)]
async fn save_filter(
    State(state): State<AppState>,
    payload: Result<Json<SavedFilter>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(filter) = payload?;
    let saved = state.saved_filters.save(filter).await?;
    Ok(respond(
        Some("Filter saved successfully"),
        json!({ "data": saved }),
    ))
}

#[tracing::instrument(skip_all, fields(id = %id))]
async fn delete_filter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.saved_filters.delete(&RowId::new(id)).await?;
    Ok(respond(Some("Filter deleted successfully"), Value::Null))
}
