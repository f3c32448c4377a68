use thiserror::Error;

use crate::FilterOperator;

/// Errors raised while translating or rendering filters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    #[error("Unknown filter operator '{operator}' on column '{column}'")]
    UnknownOperator { column: String, operator: String },

    #[error("Invalid value for column '{column}': {message}")]
    InvalidValue { column: String, message: String },

    #[error("Operator '{operator}' on column '{column}' requires a second value")]
    MissingSecondValue {
        column: String,
        operator: FilterOperator,
    },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<TranslateError> for tabula_core::TabulaError {
    fn from(err: TranslateError) -> Self {
        tabula_core::TabulaError::Validation(err.to_string())
    }
}
