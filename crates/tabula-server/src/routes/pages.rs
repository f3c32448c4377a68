use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tabula_pages::NewPage;

use super::respond;
use crate::error::ApiError;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/page", get(list_pages).post(create_page))
        .route("/api/page/get-page-data", post(get_page_data))
}

#[derive(Debug, Deserialize)]
struct SlugRequest {
    #[serde(default)]
    slug: String,
}

#[tracing::instrument(skip_all)]
async fn list_pages(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pages = state.pages.list().await.map_err(|e| {
        tracing::error!(error = %e, "failed to list pages");
        ApiError::bad_request("Error fetching pages")
    })?;
    if pages.is_empty() {
        return Err(ApiError::not_found("No Pages Found"));
    }
    Ok(respond(None, json!({ "page": pages })))
}

#[tracing::instrument(skip_all)]
async fn create_page(
    State(state): State<AppState>,
    payload: Result<Json<NewPage>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(new_page) = payload?;
    let page = state.pages.create(new_page).await?;
    Ok(respond(None, json!({ "page": page })))
}

#[tracing::instrument(skip_all)]
async fn get_page_data(
    State(state): State<AppState>,
    payload: Result<Json<SlugRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let page = state
        .pages
        .get_by_url(&request.slug)
        .await
        .map_err(ApiError::for_page)?;
    Ok(respond(None, json!({ "page": page })))
}
