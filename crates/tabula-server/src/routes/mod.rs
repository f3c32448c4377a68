//! HTTP routes
//!
//! | Prefix            | Module       |
//! |-------------------|--------------|
//! | `/api/page`       | [`pages`]    |
//! | `/api/external`   | [`external`] |
//! | `/api/tables`     | [`tables`]   |
//! | `/api/filters`    | [`filters`]  |
//! | `/pages/{slug}`   | [`render`]   |
//!
//! Every JSON body is `{status, message?, ...payload}` with `status` equal to
//! the HTTP status.

mod external;
mod filters;
mod pages;
mod render;
mod tables;

use axum::{Json, Router, middleware};
use serde_json::{Map, Value, json};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(pages::routes())
        .merge(external::routes())
        .merge(tables::routes())
        .merge(filters::routes())
        .merge(render::routes())
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::cors,
        ))
        .layer(middleware::from_fn(crate::middleware::request_id))
        .with_state(state)
}

async fn fallback() -> ApiError {
    ApiError::not_found("Route not found")
}

/// A 200 envelope. Object payloads are merged in; anything else lands under `data`.
pub(crate) fn respond(message: Option<&str>, payload: Value) -> Json<Value> {
    let mut body = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    body.insert("status".to_string(), json!(200));
    if let Some(message) = message {
        body.insert("message".to_string(), json!(message));
    }
    Json(Value::Object(body))
}
