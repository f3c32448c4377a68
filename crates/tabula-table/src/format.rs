//! Cell display formatting

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use tabula_query::ColumnType;

use crate::config::TableColumn;
use crate::lookup::LookupResults;

const MAX_TEXT: usize = 15;
const EMPTY: &str = "-";

/// Text shown in a table cell for `value`
pub fn format_cell(value: Option<&Value>, column: &TableColumn, lookups: &LookupResults) -> String {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return EMPTY.to_string();
    };
    let key = column.accessor_key.as_str();

    if let Some(label) = lookups.label_for(key, value) {
        return truncate(label);
    }
    if column.column_type == ColumnType::Select
        && let Some(label) = column.option_label(value)
    {
        return label.to_string();
    }

    if let Value::String(text) = value
        && is_date_column(column)
        && let Some(formatted) = format_date(text)
    {
        return formatted;
    }

    if let Some(number) = as_number(value) {
        if is_money(key) {
            return format_currency(number);
        }
        return match value {
            Value::Number(_) => format_number(number),
            Value::String(s) => s.clone(),
            _ => number.to_string(),
        };
    }

    match value {
        Value::String(s) => truncate(s),
        Value::Array(_) | Value::Object(_) => format_object(value),
        other => truncate(&other.to_string()),
    }
}

fn is_date_column(column: &TableColumn) -> bool {
    let key = column.accessor_key.as_str();
    column.column_type == ColumnType::Date
        || key == "createdAt"
        || key == "updatedAt"
        || key.to_lowercase().contains("date")
}

fn is_money(key: &str) -> bool {
    key == "total" || key.contains("price") || key.contains("cost") || key.contains("amount")
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

/// `dd/mm/yyyy HH:MM`
fn format_date(text: &str) -> Option<String> {
    let naive = DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()?;
    Some(naive.format("%d/%m/%Y %H:%M").to_string())
}

fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        let sign = if number < 0.0 { "-" } else { "" };
        return format!("{}{}", sign, group_thousands(number.abs() as u64));
    }
    let rounded = format!("{:.3}", number);
    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
    match rounded.split_once('.') {
        Some((whole, fraction)) => {
            let (sign, digits) = whole.strip_prefix('-').map_or(("", whole), |d| ("-", d));
            let grouped = digits
                .parse::<u64>()
                .map(group_thousands)
                .unwrap_or_else(|_| digits.to_string());
            format!("{}{}.{}", sign, grouped, fraction)
        }
        None => rounded.to_string(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_object(value: &Value) -> String {
    match value {
        Value::Array(items) => truncate(
            &items
                .iter()
                .map(|item| line_item(item).unwrap_or_else(|| plain(item)))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(map) => {
            if let (Some(name), Some(email)) = (map.get("name"), map.get("email")) {
                return truncate(&format!("{} ({})", plain(name), plain(email)));
            }
            if map.len() == 1
                && let Some(only) = map.values().next()
            {
                return match only {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    other => truncate(&plain(other)),
                };
            }
            truncate(&entries(map))
        }
        other => truncate(&plain(other)),
    }
}

/// `description (quantity × price)` for invoice-style line items
fn line_item(item: &Value) -> Option<String> {
    let map = item.as_object()?;
    let description = map.get("description").filter(|v| truthy(v))?;
    let quantity = map.get("quantity").filter(|v| truthy(v))?;
    let price = map.get("price").filter(|v| truthy(v))?;
    Some(format!(
        "{} ({} × {})",
        plain(description),
        plain(quantity),
        plain(price)
    ))
}

fn entries(map: &Map<String, Value>) -> String {
    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Array(_) | Value::Object(_) => format_object(v),
                other => truncate(&plain(other)),
            };
            format!("{}: {}", k, v)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_TEXT).collect();
    out.push_str("...");
    out
}
