use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tabula_core::TabulaError;

use crate::error::ApiError;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/pages/{slug}", get(render_page))
}

#[tracing::instrument(skip_all, fields(slug = %slug))]
async fn render_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, ApiError> {
    let page = state
        .pages
        .get_by_url(&slug)
        .await
        .map_err(ApiError::for_page)?;
    let rendered = state
        .renderer
        .render(&page)
        .await
        .map_err(TabulaError::from)?;
    for diagnostic in &rendered.diagnostics {
        tracing::debug!(%diagnostic, "page rendered with diagnostics");
    }
    Ok(Html(rendered.to_html()))
}
