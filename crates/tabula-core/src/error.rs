//! Error types for Tabula

use thiserror::Error;

/// Core error type for Tabula operations
///
/// Variants follow the user-facing taxonomy: validation problems stay local,
/// authorization and not-found errors carry a message fit for display, and
/// backend errors wrap whatever the store reported.
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorised.")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TabulaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend(message.to_string())
    }

    /// Message shown to the user, without the variant prefix
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;
