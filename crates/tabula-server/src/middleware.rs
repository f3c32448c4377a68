//! CORS headers, request ids and the external shared-secret check

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, Settings};

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Preflight cache lifetime in seconds
pub const PREFLIGHT_MAX_AGE: &str = "86400";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Run the request inside a span keyed by its id. A caller-supplied
/// `x-request-id` is kept, otherwise a fresh v4 UUID is assigned; either way
/// it is echoed on the response.
pub async fn request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| tracing::debug!(status = response.status().as_u16(), "request finished"));

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Answer preflights with 204 and stamp the CORS headers on everything else,
/// error responses included.
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        apply_cors_headers(headers, &state.settings.allowed_origins);
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), &state.settings.allowed_origins);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, allowed_origins: &str) {
    let origin = HeaderValue::from_str(allowed_origins).unwrap_or_else(|_| {
        tracing::warn!(allowed_origins, "allowed origins is not a valid header value");
        HeaderValue::from_static("")
    });
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
}

/// Exact match against the configured secret. With no secret configured
/// every external call is rejected.
pub fn require_secret(settings: &Settings, provided: Option<&str>) -> Result<(), ApiError> {
    match (settings.external_api_secret.as_deref(), provided) {
        (Some(expected), Some(provided)) if !provided.is_empty() && provided == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}
