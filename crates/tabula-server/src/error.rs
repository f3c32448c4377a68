//! HTTP error mapping

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tabula_core::TabulaError;
use thiserror::Error;

/// Fallback text for backend failures without a message
pub const GENERIC_FAILURE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation, conflict, backend and row-not-found failures
    #[error("{0}")]
    BadRequest(String),

    /// Missing or wrong shared secret
    #[error("Unauthorised.")]
    Unauthorized,

    /// Page lookups and unknown tables
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// - BadRequest: 400
    /// - Unauthorized: 401
    /// - NotFound: 404
    /// - Internal: 500
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Page lookups answer 404 where row lookups answer 400
    pub fn for_page(error: TabulaError) -> Self {
        match error {
            TabulaError::NotFound(message) => Self::NotFound(message),
            other => other.into(),
        }
    }
}

impl From<TabulaError> for ApiError {
    fn from(error: TabulaError) -> Self {
        match error {
            TabulaError::Unauthorized => Self::Unauthorized,
            TabulaError::Configuration(message) => Self::Internal(message),
            TabulaError::Io(e) => Self::Internal(e.to_string()),
            TabulaError::Backend(message) if message.trim().is_empty() => {
                Self::BadRequest(GENERIC_FAILURE.to_string())
            }
            other => Self::BadRequest(other.user_message()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
            }
            Self::Unauthorized => tracing::warn!("rejected external request"),
            other => tracing::debug!(status = status.as_u16(), error = %other, "request failed"),
        }
        let message = match &self {
            Self::Internal(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        };
        (
            status,
            Json(json!({ "status": status.as_u16(), "message": message })),
        )
            .into_response()
    }
}
