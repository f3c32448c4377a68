use tabula_core::TabulaError;
use thiserror::Error;

pub type TableResult<T> = Result<T, TableError>;

/// Table interaction errors. Every variant is a local validation problem and
/// never reaches the backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column '{0}' is not sortable")]
    NotSortable(String),

    #[error("Column '{0}' is not editable")]
    NotEditable(String),

    #[error("Editing is disabled for this table")]
    EditingDisabled,

    #[error("No filter at index {0}")]
    FilterIndex(usize),

    #[error("No row at index {0}")]
    RowIndex(usize),

    #[error("No ID provided for update")]
    MissingId,

    #[error("No rows selected")]
    EmptySelection,

    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Kanban view is not enabled for this table")]
    KanbanDisabled,

    #[error("Unknown kanban card: {0}")]
    UnknownCard(String),

    #[error("Unknown kanban column: {0}")]
    UnknownKanbanColumn(String),
}

impl TableError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<TableError> for TabulaError {
    fn from(err: TableError) -> Self {
        TabulaError::Validation(err.to_string())
    }
}
