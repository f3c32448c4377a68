use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_query::{ColumnType, FilterOperator, FilterValue};

use crate::config::TableConfig;
use crate::error::{TableError, TableResult};

/// Field of a filter row being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    Column,
    Operator,
    Value,
    SecondValue,
}

/// Why `apply_filters` left a filter out of the committed list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Incomplete,
    UnknownColumn,
    NotFilterable,
    OperatorNotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFilter {
    pub index: usize,
    pub column: String,
    pub reason: DropReason,
}

/// Filters being edited (`local`) and filters driving fetches (`committed`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    local: Vec<FilterValue>,
    committed: Vec<FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local(&self) -> &[FilterValue] {
        &self.local
    }

    pub fn committed(&self) -> &[FilterValue] {
        &self.committed
    }

    pub fn add_filter(&mut self) -> usize {
        self.local.push(FilterValue::new(
            String::new(),
            FilterOperator::Equals,
            Value::String(String::new()),
        ));
        self.local.len() - 1
    }

    /// Change one field of a local filter.
    ///
    /// A column change resets the operator to the first one the new column's
    /// type offers and clears both values.
    pub fn update_filter(
        &mut self,
        config: &TableConfig,
        index: usize,
        field: FilterField,
        value: Value,
    ) -> TableResult<()> {
        let filter = self
            .local
            .get_mut(index)
            .ok_or(TableError::FilterIndex(index))?;

        match field {
            FilterField::Column => {
                let column = value_text(&value);
                let column_type = config
                    .column(&column)
                    .map(|c| c.column_type)
                    .unwrap_or_default();
                filter.column = column;
                filter.operator = column_type.first_operator();
                filter.value = Value::String(String::new());
                filter.second_value = None;
                filter.column_type = Some(column_type);
            }
            FilterField::Operator => {
                filter.operator = FilterOperator::parse(&value_text(&value));
                if !filter.operator.requires_two_values() {
                    filter.second_value = None;
                }
            }
            FilterField::Value => filter.value = value,
            FilterField::SecondValue => filter.second_value = Some(value),
        }
        Ok(())
    }

    /// Remove a local filter and its committed counterpart, if any
    pub fn remove_filter(&mut self, index: usize) -> TableResult<FilterValue> {
        if index >= self.local.len() {
            return Err(TableError::FilterIndex(index));
        }
        let removed = self.local.remove(index);
        if let Some(position) = self.committed.iter().position(|f| same_filter(f, &removed)) {
            self.committed.remove(position);
        }
        Ok(removed)
    }

    /// Validate the local filters and commit the usable ones.
    ///
    /// Returns the filters that were left out; unknown operators are kept so
    /// the translator's policy decides what happens to them.
    pub fn apply_filters(&mut self, config: &TableConfig) -> Vec<DroppedFilter> {
        let mut committed = Vec::with_capacity(self.local.len());
        let mut dropped = Vec::new();

        for (index, filter) in self.local.iter().enumerate() {
            let reason = match config.column(&filter.column) {
                _ if !is_usable(filter) => Some(DropReason::Incomplete),
                None => Some(DropReason::UnknownColumn),
                Some(column) if !column.filterable => Some(DropReason::NotFilterable),
                Some(column) if !operator_allowed(column.column_type, &filter.operator) => {
                    Some(DropReason::OperatorNotAllowed)
                }
                Some(column) => {
                    let mut filter = filter.clone();
                    filter.column = column.accessor_key.clone();
                    filter.column_type = Some(column.column_type);
                    if !filter.operator.requires_two_values() {
                        filter.second_value = None;
                    }
                    committed.push(filter);
                    None
                }
            };

            if let Some(reason) = reason {
                tracing::debug!(index, column = %filter.column, ?reason, "filter not applied");
                dropped.push(DroppedFilter {
                    index,
                    column: filter.column.clone(),
                    reason,
                });
            }
        }

        self.committed = committed;
        dropped
    }

    /// Replace both lists, used when a saved filter is applied
    pub fn replace(&mut self, filters: Vec<FilterValue>) {
        self.local = filters.clone();
        self.committed = filters;
    }

    pub fn clear_all(&mut self) {
        self.local.clear();
        self.committed.clear();
    }
}

fn is_usable(filter: &FilterValue) -> bool {
    if !filter.is_complete() {
        return false;
    }
    if filter.operator.requires_two_values() {
        return filter
            .second_value
            .as_ref()
            .is_some_and(|v| !matches!(v, Value::Null) && v.as_str() != Some(""));
    }
    true
}

/// Null checks apply to every type; unknown operators are left to the translator
fn operator_allowed(column_type: ColumnType, operator: &FilterOperator) -> bool {
    matches!(
        operator,
        FilterOperator::IsNull | FilterOperator::IsNotNull | FilterOperator::Unknown(_)
    ) || column_type.allows(operator)
}

fn same_filter(a: &FilterValue, b: &FilterValue) -> bool {
    a.column == b.column && a.operator == b.operator && a.value == b.value
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableColumn;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> TableConfig {
        TableConfig {
            id: "orders".into(),
            columns: vec![
                TableColumn::new("name", ColumnType::Text).filterable(),
                TableColumn::new("total", ColumnType::Number).filterable(),
                TableColumn::new("created_at", ColumnType::Date).filterable(),
                TableColumn::new("notes", ColumnType::Textarea),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_column_change_resets_operator_and_values() {
        let config = config();
        let mut state = FilterState::new();
        let index = state.add_filter();
        state
            .update_filter(&config, index, FilterField::Column, json!("total"))
            .unwrap();
        state
            .update_filter(&config, index, FilterField::Operator, json!("between"))
            .unwrap();
        state
            .update_filter(&config, index, FilterField::Value, json!(5))
            .unwrap();
        state
            .update_filter(&config, index, FilterField::SecondValue, json!(9))
            .unwrap();

        state
            .update_filter(&config, index, FilterField::Column, json!("created_at"))
            .unwrap();

        let filter = &state.local()[index];
        assert_eq!(filter.operator, FilterOperator::Before);
        assert_eq!(filter.value, json!(""));
        assert_eq!(filter.second_value, None);
        assert_eq!(filter.column_type, Some(ColumnType::Date));
    }

    #[test]
    fn test_apply_drops_blank_and_unfilterable() {
        let config = config();
        let mut state = FilterState::new();
        for (column, value) in [("name", "Ann"), ("total", ""), ("notes", "x"), ("missing", "y")] {
            let index = state.add_filter();
            state
                .update_filter(&config, index, FilterField::Column, json!(column))
                .unwrap();
            state
                .update_filter(&config, index, FilterField::Value, json!(value))
                .unwrap();
        }

        let dropped = state.apply_filters(&config);

        assert_eq!(state.committed().len(), 1);
        assert_eq!(state.committed()[0].column, "name");
        assert_eq!(state.committed()[0].column_type, Some(ColumnType::Text));
        let reasons: Vec<_> = dropped.into_iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![
                DropReason::Incomplete,
                DropReason::NotFilterable,
                DropReason::UnknownColumn
            ]
        );
        assert_eq!(state.local().len(), 4);
    }

    #[test]
    fn test_range_without_second_value_is_incomplete() {
        let config = config();
        let mut state = FilterState::new();
        let index = state.add_filter();
        state
            .update_filter(&config, index, FilterField::Column, json!("total"))
            .unwrap();
        state
            .update_filter(&config, index, FilterField::Operator, json!("between"))
            .unwrap();
        state
            .update_filter(&config, index, FilterField::Value, json!(1))
            .unwrap();

        let dropped = state.apply_filters(&config);
        assert_eq!(dropped[0].reason, DropReason::Incomplete);
        assert!(state.committed().is_empty());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut state = FilterState::new();
        assert_eq!(
            state.update_filter(&config(), 3, FilterField::Value, json!("x")),
            Err(TableError::FilterIndex(3))
        );
        assert_eq!(state.remove_filter(0), Err(TableError::FilterIndex(0)));
    }

    #[test]
    fn test_remove_and_clear() {
        let config = config();
        let mut state = FilterState::new();
        let index = state.add_filter();
        state
            .update_filter(&config, index, FilterField::Column, json!("name"))
            .unwrap();
        state
            .update_filter(&config, index, FilterField::Value, json!("a"))
            .unwrap();
        state.apply_filters(&config);
        assert_eq!(state.committed().len(), 1);

        state.remove_filter(0).unwrap();
        assert!(state.committed().is_empty());

        state.add_filter();
        state.clear_all();
        assert!(state.local().is_empty());
    }
}
