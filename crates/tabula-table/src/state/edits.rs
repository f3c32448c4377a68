//! Pending inline edits
//!
//! Cell edits are validated and queued per (row, column) until an explicit
//! save. The row index is only a transient key for the current page; commits
//! always go through the row's `id`.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;
use tabula_core::Row;
use tabula_query::ColumnType;

use crate::config::{FieldValidation, TableColumn};
use crate::error::{TableError, TableResult};

/// An uncommitted cell change
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub row_index: usize,
    pub column_key: String,
    pub value: Value,
    /// The row as it was displayed when the first edit on it was queued
    pub original_data: Row,
}

#[derive(Debug, Clone, Default)]
pub struct PendingEdits {
    edits: BTreeMap<(usize, String), PendingEdit>,
}

impl PendingEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `raw` for `column` and queue it.
    ///
    /// Returns `Ok(false)` when the value matches the original, in which case
    /// any pending edit for the cell is dropped.
    pub fn upsert(
        &mut self,
        row_index: usize,
        column: &TableColumn,
        raw: Value,
        original: &Row,
    ) -> TableResult<bool> {
        let value = validate_cell(column, raw)?;
        let key = (row_index, column.accessor_key.clone());

        let original_value = original.get_path(&column.accessor_key).unwrap_or(&Value::Null);
        if same_value(original_value, &value) {
            self.edits.remove(&key);
            return Ok(false);
        }

        match self.edits.get_mut(&key) {
            Some(existing) => existing.value = value,
            None => {
                self.edits.insert(
                    key,
                    PendingEdit {
                        row_index,
                        column_key: column.accessor_key.clone(),
                        value,
                        original_data: original.clone(),
                    },
                );
            }
        }
        Ok(true)
    }

    pub fn is_pending(&self, row_index: usize, column_key: &str) -> bool {
        self.edits.contains_key(&(row_index, column_key.to_string()))
    }

    pub fn get(&self, row_index: usize, column_key: &str) -> Option<&PendingEdit> {
        self.edits.get(&(row_index, column_key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEdit> {
        self.edits.values()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn drain(&mut self) -> Vec<PendingEdit> {
        std::mem::take(&mut self.edits).into_values().collect()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&PendingEdit) -> bool) {
        self.edits.retain(|_, edit| keep(edit));
    }

    /// Drop every pending edit on `row_index`
    pub fn remove_row(&mut self, row_index: usize) {
        self.edits.retain(|(row, _), _| *row != row_index);
    }

    /// One patch per edited row, in row order
    pub fn patches_by_row(&self) -> Vec<(usize, Row)> {
        let mut patches: Vec<(usize, Row)> = Vec::new();
        for edit in self.edits.values() {
            match patches.last_mut() {
                Some((row, patch)) if *row == edit.row_index => {
                    patch.insert(edit.column_key.clone(), edit.value.clone());
                }
                _ => patches.push((
                    edit.row_index,
                    Row::new().with(edit.column_key.clone(), edit.value.clone()),
                )),
            }
        }
        patches
    }
}

/// Coerce and validate one cell value against its column.
///
/// Number columns parse numeric strings; a blank number becomes null. The
/// column's `editConfig.validation` rules are applied after coercion.
pub fn validate_cell(column: &TableColumn, raw: Value) -> TableResult<Value> {
    let value = match column.column_type {
        ColumnType::Number => coerce_number(column, raw)?,
        ColumnType::Boolean => match raw {
            Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            other => other,
        },
        _ => raw,
    };

    if let Some(validation) = column
        .edit_config
        .as_ref()
        .and_then(|c| c.validation.as_ref())
    {
        check_rules(column, validation, &value)?;
    }
    Ok(value)
}

fn coerce_number(column: &TableColumn, raw: Value) -> TableResult<Value> {
    match raw {
        Value::Number(_) | Value::Null => Ok(raw),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => {
            let text = s.trim();
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::from(i));
            }
            text.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| {
                    TableError::invalid_field(display_name(column), "must be a number")
                })
        }
        _ => Err(TableError::invalid_field(
            display_name(column),
            "must be a number",
        )),
    }
}

fn check_rules(column: &TableColumn, rules: &FieldValidation, value: &Value) -> TableResult<()> {
    let fail = |default: String| {
        TableError::invalid_field(
            display_name(column),
            rules.error_message.clone().unwrap_or(default),
        )
    };

    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if text.trim().is_empty() {
        return if rules.required {
            Err(fail("is required".to_string()))
        } else {
            Ok(())
        };
    }

    let length = text.chars().count();
    if let Some(min) = rules.min_length
        && length < min
    {
        return Err(fail(format!("must be at least {} characters", min)));
    }
    if let Some(max) = rules.max_length
        && length > max
    {
        return Err(fail(format!("must be at most {} characters", max)));
    }
    if let Some(pattern) = rules.pattern.as_deref() {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(&text) => return Err(fail("has an invalid format".to_string())),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(column = %column.accessor_key, error = %e, "ignoring invalid validation pattern");
            }
        }
    }
    Ok(())
}

fn same_value(original: &Value, value: &Value) -> bool {
    match (original, value) {
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        _ => tabula_query::eval::values_equal(original, value),
    }
}

fn display_name(column: &TableColumn) -> &str {
    if column.header.is_empty() {
        &column.accessor_key
    } else {
        &column.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormFieldConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(value: Value) -> Row {
        Row::from_value(value).unwrap()
    }

    fn name_column() -> TableColumn {
        TableColumn::new("name", ColumnType::Text)
            .editable()
            .with_edit_config(FormFieldConfig {
                name: "name".into(),
                field_type: "input".into(),
                label: "Name".into(),
                validation: Some(FieldValidation {
                    required: true,
                    min_length: Some(2),
                    pattern: Some("^[A-Za-z ]+$".into()),
                    ..Default::default()
                }),
                ..Default::default()
            })
    }

    #[test]
    fn test_upsert_keeps_first_original() {
        let column = name_column();
        let mut edits = PendingEdits::new();
        let original = row(json!({"id": 1, "name": "Anna"}));

        assert!(edits.upsert(0, &column, json!("Ann"), &original).unwrap());
        let changed = row(json!({"id": 1, "name": "Ann"}));
        assert!(edits.upsert(0, &column, json!("Annie"), &changed).unwrap());

        let edit = edits.get(0, "name").unwrap();
        assert_eq!(edit.value, json!("Annie"));
        assert_eq!(edit.original_data, original);
    }

    #[test]
    fn test_reverting_to_original_drops_the_edit() {
        let column = name_column();
        let mut edits = PendingEdits::new();
        let original = row(json!({"id": 1, "name": "Anna"}));

        edits.upsert(0, &column, json!("Ann"), &original).unwrap();
        assert!(!edits.upsert(0, &column, json!("Anna"), &original).unwrap());
        assert!(!edits.is_pending(0, "name"));
    }

    #[test]
    fn test_validation_rules() {
        let column = name_column();
        let original = row(json!({"id": 1, "name": "Anna"}));
        let mut edits = PendingEdits::new();

        let err = edits.upsert(0, &column, json!(""), &original).unwrap_err();
        assert_eq!(err.to_string(), "name: is required");
        assert!(edits.upsert(0, &column, json!("A"), &original).is_err());
        assert!(edits.upsert(0, &column, json!("Ann4"), &original).is_err());
        assert!(edits.is_empty());
    }

    #[test]
    fn test_number_columns_are_coerced() {
        let column = TableColumn::new("total", ColumnType::Number).editable();
        assert_eq!(validate_cell(&column, json!(" 12 ")).unwrap(), json!(12));
        assert_eq!(validate_cell(&column, json!("12.5")).unwrap(), json!(12.5));
        assert_eq!(validate_cell(&column, json!("")).unwrap(), Value::Null);
        assert!(validate_cell(&column, json!("twelve")).is_err());
    }

    #[test]
    fn test_patches_group_by_row() {
        let name = TableColumn::new("name", ColumnType::Text);
        let city = TableColumn::new("address.city", ColumnType::Text);
        let first = row(json!({"id": 1, "name": "A", "address": {"city": "Leeds"}}));
        let second = row(json!({"id": 2, "name": "B"}));

        let mut edits = PendingEdits::new();
        edits.upsert(1, &name, json!("Bee"), &second).unwrap();
        edits.upsert(0, &name, json!("Ay"), &first).unwrap();
        edits.upsert(0, &city, json!("York"), &first).unwrap();

        let patches = edits.patches_by_row();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].0, 0);
        assert_eq!(
            patches[0].1.clone().into_value(),
            json!({"address.city": "York", "name": "Ay"})
        );
        assert_eq!(patches[1].1.clone().into_value(), json!({"name": "Bee"}));

        edits.remove_row(0);
        assert_eq!(edits.len(), 1);
    }
}
