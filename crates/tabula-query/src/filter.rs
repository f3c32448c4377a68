use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ColumnType, FilterOperator};

/// One filter row: column, operator and up to two operand values.
///
/// On the wire the column is sent as either `column` (table state) or
/// `field` (fetch payload).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterValue {
    #[serde(alias = "field")]
    pub column: String,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_value: Option<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
}

impl FilterValue {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            second_value: None,
            column_type: None,
        }
    }

    pub fn with_second_value(mut self, value: impl Into<Value>) -> Self {
        self.second_value = Some(value.into());
        self
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    /// Declared type, `text` when none was attached
    pub fn resolved_type(&self) -> ColumnType {
        self.column_type.unwrap_or_default()
    }

    /// True when the value is absent: null, an empty string or an empty list
    pub fn value_is_blank(&self) -> bool {
        is_blank(&self.value)
    }

    /// Whether the filter has everything needed to be applied
    pub fn is_complete(&self) -> bool {
        if self.column.is_empty() || self.operator.as_str().is_empty() {
            return false;
        }
        !self.operator.requires_value() || !self.value_is_blank()
    }
}

pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
