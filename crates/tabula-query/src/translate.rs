//! Predicate translation
//!
//! Maps one [`FilterValue`] onto one backend-neutral [`Predicate`]. Filter
//! lists combine with an implicit AND; there is no OR or grouping.

use chrono::NaiveDate;
use serde_json::Value;
use tabula_core::{CompareOp, LikePattern, Predicate};

use crate::filter::is_blank;
use crate::{ColumnType, FilterOperator, FilterValue, TranslateError};

/// What to do with an operator the translator does not recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownOperatorPolicy {
    /// Emit no predicate, log a warning and report the filter as skipped
    #[default]
    Skip,
    /// Fail the whole translation
    Reject,
}

/// Why a filter produced no predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Missing column, or missing value for an operator that needs one
    Incomplete,
    UnknownOperator(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFilter {
    pub index: usize,
    pub column: String,
    pub reason: SkipReason,
}

/// Result of translating a filter list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Translation {
    pub predicates: Vec<Predicate>,
    pub skipped: Vec<SkippedFilter>,
}

#[derive(Debug, Clone, Default)]
pub struct PredicateTranslator {
    policy: UnknownOperatorPolicy,
}

impl PredicateTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: UnknownOperatorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnknownOperatorPolicy {
        self.policy
    }

    /// Translate a single filter.
    ///
    /// Returns `Ok(None)` when the filter is incomplete (no column, or no value
    /// for an operator that needs one). Unknown operators are always an error
    /// here; [`translate_all`](Self::translate_all) applies the policy.
    pub fn translate(&self, filter: &FilterValue) -> Result<Option<Predicate>, TranslateError> {
        let column = filter.column.trim();
        if column.is_empty() {
            return Ok(None);
        }
        if let FilterOperator::Unknown(operator) = &filter.operator {
            return Err(TranslateError::UnknownOperator {
                column: column.to_string(),
                operator: operator.clone(),
            });
        }
        if filter.operator.requires_value() && filter.value_is_blank() {
            return Ok(None);
        }

        let column_type = filter.resolved_type();
        let column = column.to_string();

        let predicate = match &filter.operator {
            FilterOperator::Equals | FilterOperator::Is => compare(
                column.clone(),
                CompareOp::Eq,
                coerce_scalar(&column, column_type, &filter.value)?,
            ),
            FilterOperator::NotEquals | FilterOperator::IsNot => compare(
                column.clone(),
                CompareOp::Ne,
                coerce_scalar(&column, column_type, &filter.value)?,
            ),
            FilterOperator::GreaterThan | FilterOperator::After => compare(
                column.clone(),
                CompareOp::Gt,
                coerce_scalar(&column, column_type, &filter.value)?,
            ),
            FilterOperator::GreaterThanEqual => compare(
                column.clone(),
                CompareOp::Gte,
                coerce_scalar(&column, column_type, &filter.value)?,
            ),
            FilterOperator::LessThan | FilterOperator::Before => compare(
                column.clone(),
                CompareOp::Lt,
                coerce_scalar(&column, column_type, &filter.value)?,
            ),
            FilterOperator::LessThanEqual => compare(
                column.clone(),
                CompareOp::Lte,
                coerce_scalar(&column, column_type, &filter.value)?,
            ),
            FilterOperator::Contains => like(column, LikePattern::Contains, &filter.value, false),
            FilterOperator::NotContains => like(column, LikePattern::Contains, &filter.value, true),
            FilterOperator::StartsWith => {
                like(column, LikePattern::StartsWith, &filter.value, false)
            }
            FilterOperator::EndsWith => like(column, LikePattern::EndsWith, &filter.value, false),
            FilterOperator::Between | FilterOperator::DateRange => {
                let second = filter
                    .second_value
                    .as_ref()
                    .filter(|v| !is_blank(v))
                    .ok_or_else(|| TranslateError::MissingSecondValue {
                        column: column.clone(),
                        operator: filter.operator.clone(),
                    })?;
                Predicate::Between {
                    low: coerce_scalar(&column, column_type, &filter.value)?,
                    high: coerce_scalar(&column, column_type, second)?,
                    column,
                }
            }
            FilterOperator::OnDate => {
                let day = parse_day(&column, &filter.value)?;
                Predicate::Between {
                    column,
                    low: Value::String(day.format("%Y-%m-%d").to_string()),
                    high: Value::String(format!("{}T23:59:59.999Z", day.format("%Y-%m-%d"))),
                }
            }
            FilterOperator::In | FilterOperator::NotIn => Predicate::In {
                values: coerce_list(&column, column_type, &filter.value)?,
                negated: filter.operator == FilterOperator::NotIn,
                column,
            },
            FilterOperator::HasAny => Predicate::Overlaps {
                values: coerce_list(&column, column_type, &filter.value)?,
                column,
            },
            FilterOperator::HasAll => Predicate::ContainsAll {
                values: coerce_list(&column, column_type, &filter.value)?,
                column,
            },
            FilterOperator::IsTrue => compare(column, CompareOp::Eq, Value::Bool(true)),
            FilterOperator::IsFalse => compare(column, CompareOp::Eq, Value::Bool(false)),
            FilterOperator::IsNull => Predicate::IsNull {
                column,
                negated: false,
            },
            FilterOperator::IsNotNull => Predicate::IsNull {
                column,
                negated: true,
            },
            FilterOperator::Unknown(_) => return Ok(None),
        };

        Ok(Some(predicate))
    }

    /// Translate a filter list, applying the unknown-operator policy
    pub fn translate_all(&self, filters: &[FilterValue]) -> Result<Translation, TranslateError> {
        let mut translation = Translation::default();

        for (index, filter) in filters.iter().enumerate() {
            match self.translate(filter) {
                Ok(Some(predicate)) => translation.predicates.push(predicate),
                Ok(None) => translation.skipped.push(SkippedFilter {
                    index,
                    column: filter.column.clone(),
                    reason: SkipReason::Incomplete,
                }),
                Err(TranslateError::UnknownOperator { column, operator })
                    if self.policy == UnknownOperatorPolicy::Skip =>
                {
                    tracing::warn!(
                        column = %column,
                        operator = %operator,
                        "skipping filter with unknown operator"
                    );
                    translation.skipped.push(SkippedFilter {
                        index,
                        column,
                        reason: SkipReason::UnknownOperator(operator),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(translation)
    }

    /// Free-text search: case-insensitive substring match on one column
    pub fn search(&self, column: &str, term: &str) -> Option<Predicate> {
        if column.is_empty() || term.trim().is_empty() {
            return None;
        }
        Some(Predicate::contains(column, term))
    }
}

fn compare(column: String, op: CompareOp, value: Value) -> Predicate {
    Predicate::Compare { column, op, value }
}

fn like(column: String, pattern: LikePattern, value: &Value, negated: bool) -> Predicate {
    Predicate::Like {
        column,
        pattern,
        needle: value_text(value),
        negated,
    }
}

/// Text form of a scalar, used for pattern needles
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn coerce_scalar(
    column: &str,
    column_type: ColumnType,
    value: &Value,
) -> Result<Value, TranslateError> {
    match column_type {
        ColumnType::Number => coerce_number(column, value),
        _ => Ok(value.clone()),
    }
}

fn coerce_number(column: &str, value: &Value) -> Result<Value, TranslateError> {
    let invalid = || TranslateError::InvalidValue {
        column: column.to_string(),
        message: format!("expected a number, got {}", value),
    };

    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Value::from(n));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// List operand: a JSON array, or a comma-separated string
fn coerce_list(
    column: &str,
    column_type: ColumnType,
    value: &Value,
) -> Result<Vec<Value>, TranslateError> {
    let items: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        other => vec![other.clone()],
    };

    items
        .iter()
        .map(|item| coerce_scalar(column, column_type, item))
        .collect()
}

fn parse_day(column: &str, value: &Value) -> Result<NaiveDate, TranslateError> {
    let text = value_text(value);
    text.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| TranslateError::InvalidValue {
            column: column.to_string(),
            message: format!("expected a date (YYYY-MM-DD), got '{}'", text),
        })
}
