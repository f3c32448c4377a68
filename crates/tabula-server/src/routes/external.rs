//! Secret-guarded page routes for other services
//!
//! POST bodies carry `EXTERNAL_API_SECRET` next to the payload; GET requests
//! send it in the `x-external-api-secret` header so it stays out of URLs and
//! access logs. The secret is checked before the payload is looked at.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tabula_core::RowId;
use tabula_pages::NewPage;

use super::respond;
use crate::error::ApiError;
use crate::middleware::require_secret;
use crate::state::AppState;

pub const SECRET_FIELD: &str = "EXTERNAL_API_SECRET";

pub const SECRET_HEADER: &str = "x-external-api-secret";

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/external/page", get(list_pages).post(create_page))
        .route("/api/external/get-page", post(get_page))
        .route("/api/external/page-data", post(get_page))
        .route("/api/external/insert-page", post(insert_page))
        .route("/api/external/get-pages", get(get_pages))
        .route("/api/external/page/get-page", post(get_page))
        .route("/api/external/page/insert-page", post(insert_page))
        .route("/api/external/page/get-pages", get(get_pages))
}

fn authorize_body(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Value, ApiError> {
    let Json(body) = payload?;
    require_secret(
        &state.settings,
        body.get(SECRET_FIELD).and_then(Value::as_str),
    )?;
    Ok(body)
}

fn authorize_header(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    require_secret(
        &state.settings,
        headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok()),
    )
}

#[tracing::instrument(skip_all)]
async fn list_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    authorize_header(&state, &headers)?;
    let pages = state.pages.list().await.map_err(|e| {
        tracing::error!(error = %e, "failed to list pages");
        ApiError::bad_request("Error fetching pages")
    })?;
    if pages.is_empty() {
        return Err(ApiError::not_found("No Pages Found"));
    }
    Ok(respond(None, json!({ "page": pages })))
}

/// Same listing, nested under `page.data`
#[tracing::instrument(skip_all)]
async fn get_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    authorize_header(&state, &headers)?;
    let pages = state.pages.list().await.map_err(|e| {
        tracing::error!(error = %e, "failed to list pages");
        ApiError::bad_request("Error fetching pages")
    })?;
    if pages.is_empty() {
        return Err(ApiError::not_found("No Pages Found"));
    }
    Ok(respond(None, json!({ "page": { "data": pages } })))
}

#[tracing::instrument(skip_all)]
async fn create_page(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = authorize_body(&state, payload)?;
    let new_page: NewPage =
        serde_json::from_value(body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let page = state.pages.create(new_page).await?;
    Ok(respond(
        Some("Page Created Successfully."),
        json!({ "page": page }),
    ))
}

#[tracing::instrument(skip_all)]
async fn get_page(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = authorize_body(&state, payload)?;
    let not_found = || ApiError::bad_request("A page with this URL not found.");

    let id = body
        .get("pageId")
        .and_then(RowId::from_value)
        .ok_or_else(not_found)?;
    let page = state.pages.get_by_id(&id).await?.ok_or_else(not_found)?;
    Ok(respond(
        Some("Page fetched Successfully."),
        json!({ "page": page }),
    ))
}

#[tracing::instrument(skip_all)]
async fn insert_page(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut body = authorize_body(&state, payload)?;
    let data = body
        .get_mut("pageData")
        .map(Value::take)
        .unwrap_or(Value::Null);
    let page = state.pages.insert_raw(data).await?;
    Ok(respond(
        Some("Page added Successfully."),
        json!({ "page": page }),
    ))
}
