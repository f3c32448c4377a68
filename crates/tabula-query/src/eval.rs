//! In-memory predicate evaluation and sorting
//!
//! Used by the in-memory store and by tests that check translated filters
//! against fixture rows. Comparison order: numbers, then dates, then
//! case-insensitive text. Null and absent fields never satisfy a comparison.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tabula_core::{CompareOp, LikePattern, Predicate, Row, SortSpec};

/// True when `row` satisfies every predicate
pub fn matches(row: &Row, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| matches_one(row, p))
}

pub fn matches_one(row: &Row, predicate: &Predicate) -> bool {
    let field = row.get_path(predicate.column()).filter(|v| !v.is_null());

    match predicate {
        Predicate::IsNull { negated, .. } => field.is_some() == *negated,
        Predicate::Compare { op, value, .. } => {
            let Some(field) = field else {
                return false;
            };
            match op {
                CompareOp::Eq => values_equal(field, value),
                CompareOp::Ne => !values_equal(field, value),
                CompareOp::Gt => compare_values(field, value) == Ordering::Greater,
                CompareOp::Gte => compare_values(field, value) != Ordering::Less,
                CompareOp::Lt => compare_values(field, value) == Ordering::Less,
                CompareOp::Lte => compare_values(field, value) != Ordering::Greater,
            }
        }
        Predicate::Like {
            pattern,
            needle,
            negated,
            ..
        } => {
            let Some(field) = field else {
                return false;
            };
            let haystack = text_of(field).to_lowercase();
            let needle = needle.to_lowercase();
            let found = match pattern {
                LikePattern::Contains => haystack.contains(&needle),
                LikePattern::StartsWith => haystack.starts_with(&needle),
                LikePattern::EndsWith => haystack.ends_with(&needle),
            };
            found != *negated
        }
        Predicate::Between { low, high, .. } => field.is_some_and(|f| {
            compare_values(f, low) != Ordering::Less && compare_values(f, high) != Ordering::Greater
        }),
        Predicate::In {
            values, negated, ..
        } => field.is_some_and(|f| values.iter().any(|v| values_equal(f, v)) != *negated),
        Predicate::Overlaps { values, .. } => field
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|item| values.iter().any(|v| values_equal(item, v)))),
        Predicate::ContainsAll { values, .. } => field
            .and_then(Value::as_array)
            .is_some_and(|items| values.iter().all(|v| items.iter().any(|item| values_equal(item, v)))),
    }
}

/// Equality that treats `5` and `"5"` as equal but is otherwise exact
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Total order used for range comparisons and sorting
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (as_datetime(a), as_datetime(b)) {
        return x.cmp(&y);
    }
    text_of(a).to_lowercase().cmp(&text_of(b).to_lowercase())
}

/// Sort rows in place; ties fall back to `id` ascending
pub fn sort_rows(rows: &mut [Row], sort: &SortSpec) {
    rows.sort_by(|a, b| {
        let left = a.get_path(&sort.column).unwrap_or(&Value::Null);
        let right = b.get_path(&sort.column).unwrap_or(&Value::Null);
        let ordering = compare_values(left, right);
        let ordering = if sort.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        ordering.then_with(|| {
            let left = a.get("id").unwrap_or(&Value::Null);
            let right = b.get("id").unwrap_or(&Value::Null);
            compare_values(left, right)
        })
    });
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
