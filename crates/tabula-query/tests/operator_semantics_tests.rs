//! Every operator/type pair, translated and evaluated against one fixture

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tabula_core::Row;
use tabula_query::{ColumnType, FilterOperator, FilterValue, PredicateTranslator, eval};

fn fixture() -> Vec<Row> {
    [
        json!({"id": 1, "name": "Anna", "status": "Active", "price": 12, "created": "2024-01-05T09:30:00Z", "tags": ["red", "blue"], "email": null, "vip": true}),
        json!({"id": 2, "name": "Bob", "status": "Inactive", "price": 40, "created": "2024-02-10T12:00:00Z", "tags": ["green"], "email": "bob@example.com", "vip": false}),
        json!({"id": 3, "name": "Diana", "status": "Active", "price": 25.5, "created": "2024-02-11T00:00:00Z", "tags": ["blue", "green"], "vip": false}),
    ]
    .into_iter()
    .map(|v| Row::from_value(v).unwrap())
    .collect()
}

fn ids_matching(filter: FilterValue) -> Vec<i64> {
    let predicate = PredicateTranslator::new()
        .translate(&filter)
        .unwrap()
        .expect("complete filter");
    fixture()
        .iter()
        .filter(|row| eval::matches_one(row, &predicate))
        .filter_map(|row| row.get("id").and_then(Value::as_i64))
        .collect()
}

fn text(column: &str, operator: FilterOperator, value: &str) -> Vec<i64> {
    ids_matching(FilterValue::new(column, operator, value).with_type(ColumnType::Text))
}

fn number(operator: FilterOperator, value: &str, second: Option<&str>) -> Vec<i64> {
    let mut filter = FilterValue::new("price", operator, value).with_type(ColumnType::Number);
    if let Some(second) = second {
        filter = filter.with_second_value(second);
    }
    ids_matching(filter)
}

#[test]
fn test_text_operators() {
    assert_eq!(text("status", FilterOperator::Equals, "Active"), vec![1, 3]);
    assert_eq!(text("status", FilterOperator::NotEquals, "Active"), vec![2]);
    assert_eq!(text("name", FilterOperator::Contains, "AN"), vec![1, 3]);
    assert_eq!(text("name", FilterOperator::NotContains, "an"), vec![2]);
    assert_eq!(text("name", FilterOperator::StartsWith, "di"), vec![3]);
    assert_eq!(text("name", FilterOperator::EndsWith, "OB"), vec![2]);
}

#[test]
fn test_select_operators() {
    let is = FilterValue::new("status", FilterOperator::Is, "Inactive").with_type(ColumnType::Select);
    assert_eq!(ids_matching(is), vec![2]);
    let is_not = FilterValue::new("status", FilterOperator::IsNot, "Inactive").with_type(ColumnType::Select);
    assert_eq!(ids_matching(is_not), vec![1, 3]);
}

#[test]
fn test_number_operators() {
    assert_eq!(number(FilterOperator::Equals, "40", None), vec![2]);
    assert_eq!(number(FilterOperator::GreaterThan, "12", None), vec![2, 3]);
    assert_eq!(number(FilterOperator::LessThan, "25.5", None), vec![1]);
    assert_eq!(number(FilterOperator::GreaterThanEqual, "25.5", None), vec![2, 3]);
    assert_eq!(number(FilterOperator::LessThanEqual, "12", None), vec![1]);
    assert_eq!(number(FilterOperator::Between, "12", Some("25.5")), vec![1, 3]);
}

#[test]
fn test_date_operators() {
    let date = |operator, value: &str| {
        FilterValue::new("created", operator, value).with_type(ColumnType::Date)
    };
    assert_eq!(ids_matching(date(FilterOperator::Before, "2024-02-01")), vec![1]);
    assert_eq!(ids_matching(date(FilterOperator::After, "2024-02-10T12:00:00Z")), vec![3]);
    assert_eq!(ids_matching(date(FilterOperator::OnDate, "2024-02-11")), vec![3]);
    assert_eq!(
        ids_matching(date(FilterOperator::DateRange, "2024-02-01").with_second_value("2024-02-10T23:59:59Z")),
        vec![2]
    );
}

#[test]
fn test_array_operators() {
    let array = |operator, value: Value| {
        FilterValue::new("tags", operator, value).with_type(ColumnType::Array)
    };
    assert_eq!(ids_matching(array(FilterOperator::HasAny, json!(["red", "green"]))), vec![1, 2, 3]);
    assert_eq!(ids_matching(array(FilterOperator::HasAll, json!("blue, green"))), vec![3]);

    let status_in = FilterValue::new("status", FilterOperator::In, "Inactive,Pending");
    assert_eq!(ids_matching(status_in), vec![2]);
    let status_not_in = FilterValue::new("status", FilterOperator::NotIn, json!(["Inactive"]));
    assert_eq!(ids_matching(status_not_in), vec![1, 3]);
}

#[test]
fn test_null_and_boolean_operators() {
    assert_eq!(ids_matching(FilterValue::new("email", FilterOperator::IsNull, Value::Null)), vec![1, 3]);
    assert_eq!(ids_matching(FilterValue::new("email", FilterOperator::IsNotNull, Value::Null)), vec![2]);
    assert_eq!(ids_matching(FilterValue::new("vip", FilterOperator::IsTrue, Value::Null)), vec![1]);
    assert_eq!(ids_matching(FilterValue::new("vip", FilterOperator::IsFalse, Value::Null)), vec![2, 3]);
}

#[test]
fn test_filters_combine_with_and() {
    let filters = vec![
        FilterValue::new("status", FilterOperator::Equals, "Active"),
        FilterValue::new("price", FilterOperator::GreaterThan, "20").with_type(ColumnType::Number),
    ];
    let translation = PredicateTranslator::new().translate_all(&filters).unwrap();
    let ids: Vec<i64> = fixture()
        .iter()
        .filter(|row| eval::matches(row, &translation.predicates))
        .filter_map(|row| row.get("id").and_then(Value::as_i64))
        .collect();
    assert_eq!(ids, vec![3]);
}
