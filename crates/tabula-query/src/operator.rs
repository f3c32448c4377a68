//! Filter operators and column types
//!
//! Operator names are the camelCase strings the table UI sends over the wire.
//! Unrecognized names are kept as [`FilterOperator::Unknown`] so the
//! translator can decide what to do with them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Filter operators offered by the table UI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    // Equality operators
    #[default]
    Equals,
    NotEquals,
    Is,
    IsNot,

    // String operators
    Contains,
    NotContains,
    StartsWith,
    EndsWith,

    // Comparison operators
    GreaterThan,
    LessThan,
    GreaterThanEqual,
    LessThanEqual,

    // Range operators
    Between,
    DateRange,

    // Date operators
    Before,
    After,
    OnDate,

    // List operators
    In,
    NotIn,
    HasAny,
    HasAll,

    // Boolean / NULL operators
    IsTrue,
    IsFalse,
    IsNull,
    IsNotNull,

    /// An operator name this build does not know
    Unknown(String),
}

impl FilterOperator {
    /// Parse a wire name. Never fails; unknown names become `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name {
            "equals" => Self::Equals,
            "notEquals" => Self::NotEquals,
            "is" => Self::Is,
            "isNot" => Self::IsNot,
            "contains" => Self::Contains,
            "notContains" => Self::NotContains,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "greaterThan" => Self::GreaterThan,
            "lessThan" => Self::LessThan,
            "greaterThanEqual" => Self::GreaterThanEqual,
            "lessThanEqual" => Self::LessThanEqual,
            "between" => Self::Between,
            "dateRange" => Self::DateRange,
            "before" => Self::Before,
            "after" => Self::After,
            "onDate" => Self::OnDate,
            "in" => Self::In,
            "notIn" => Self::NotIn,
            "hasAny" => Self::HasAny,
            "hasAll" => Self::HasAll,
            "isTrue" => Self::IsTrue,
            "isFalse" => Self::IsFalse,
            "isNull" => Self::IsNull,
            "isNotNull" => Self::IsNotNull,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire name of the operator
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Is => "is",
            Self::IsNot => "isNot",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
            Self::GreaterThanEqual => "greaterThanEqual",
            Self::LessThanEqual => "lessThanEqual",
            Self::Between => "between",
            Self::DateRange => "dateRange",
            Self::Before => "before",
            Self::After => "after",
            Self::OnDate => "onDate",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::HasAny => "hasAny",
            Self::HasAll => "hasAll",
            Self::IsTrue => "isTrue",
            Self::IsFalse => "isFalse",
            Self::IsNull => "isNull",
            Self::IsNotNull => "isNotNull",
            Self::Unknown(name) => name,
        }
    }

    /// Get the display label for the operator
    pub fn label(&self) -> &str {
        match self {
            Self::Equals => "Equals",
            Self::NotEquals => "Not equals",
            Self::Is => "Is",
            Self::IsNot => "Is not",
            Self::Contains => "Contains",
            Self::NotContains => "Does not contain",
            Self::StartsWith => "Starts with",
            Self::EndsWith => "Ends with",
            Self::GreaterThan => "Greater than",
            Self::LessThan => "Less than",
            Self::GreaterThanEqual => "Greater than or equal",
            Self::LessThanEqual => "Less than or equal",
            Self::Between => "Between",
            Self::DateRange => "Date range",
            Self::Before => "Before",
            Self::After => "After",
            Self::OnDate => "On date",
            Self::In => "In",
            Self::NotIn => "Not in",
            Self::HasAny => "Has any",
            Self::HasAll => "Has all",
            Self::IsTrue => "Is true",
            Self::IsFalse => "Is false",
            Self::IsNull => "Is empty",
            Self::IsNotNull => "Is not empty",
            Self::Unknown(name) => name,
        }
    }

    /// Returns true if this operator requires a value input
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            Self::IsTrue | Self::IsFalse | Self::IsNull | Self::IsNotNull
        )
    }

    /// Returns true if this operator requires two values (`secondValue`)
    pub fn requires_two_values(&self) -> bool {
        matches!(self, Self::Between | Self::DateRange)
    }

    /// Returns true if the value is a list (JSON array or comma-separated)
    pub fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn | Self::HasAny | Self::HasAll)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl From<String> for FilterOperator {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FilterOperator> for String {
    fn from(value: FilterOperator) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    #[default]
    Text,
    Hidden,
    Textarea,
    Email,
    Number,
    Date,
    Select,
    Array,
    Boolean,
}

impl ColumnType {
    /// Parse a type name; unknown names fall back to `Text`
    pub fn parse(name: &str) -> Self {
        match name {
            "hidden" => Self::Hidden,
            "textarea" => Self::Textarea,
            "email" => Self::Email,
            "number" => Self::Number,
            "date" => Self::Date,
            "select" => Self::Select,
            "array" => Self::Array,
            "boolean" => Self::Boolean,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Hidden => "hidden",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::Array => "array",
            Self::Boolean => "boolean",
        }
    }

    /// Operators offered for this type, in display order
    pub fn operators(&self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            Self::Text => &[Equals, NotEquals, Contains, NotContains, StartsWith, EndsWith],
            Self::Hidden => &[Equals, NotEquals],
            Self::Textarea | Self::Email => &[Equals, NotEquals, Contains, NotContains],
            Self::Number => &[
                Equals,
                NotEquals,
                GreaterThan,
                LessThan,
                GreaterThanEqual,
                LessThanEqual,
                Between,
            ],
            Self::Date => &[Before, After, OnDate, DateRange],
            Self::Select => &[Is, IsNot],
            Self::Array => &[HasAny, HasAll, In, NotIn],
            Self::Boolean => &[IsTrue, IsFalse],
        }
    }

    /// The operator a filter resets to when its column changes to this type
    pub fn first_operator(&self) -> FilterOperator {
        self.operators()
            .first()
            .cloned()
            .unwrap_or(FilterOperator::Equals)
    }

    pub fn allows(&self, operator: &FilterOperator) -> bool {
        self.operators().contains(operator)
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operator_wire_names_round_trip_through_serde() {
        let json = serde_json::to_string(&FilterOperator::GreaterThanEqual).unwrap();
        assert_eq!(json, "\"greaterThanEqual\"");

        let parsed: FilterOperator = serde_json::from_str("\"notContains\"").unwrap();
        assert_eq!(parsed, FilterOperator::NotContains);
    }

    #[test]
    fn test_unknown_operator_is_preserved() {
        let parsed: FilterOperator = serde_json::from_str("\"fuzzy\"").unwrap();
        assert_eq!(parsed, FilterOperator::Unknown("fuzzy".to_string()));
        assert!(parsed.is_unknown());
        assert_eq!(parsed.as_str(), "fuzzy");
    }

    #[test]
    fn test_first_operator_per_type() {
        assert_eq!(ColumnType::Text.first_operator(), FilterOperator::Equals);
        assert_eq!(ColumnType::Number.first_operator(), FilterOperator::Equals);
        assert_eq!(ColumnType::Date.first_operator(), FilterOperator::Before);
        assert_eq!(ColumnType::Select.first_operator(), FilterOperator::Is);
        assert_eq!(ColumnType::Array.first_operator(), FilterOperator::HasAny);
        assert_eq!(ColumnType::Boolean.first_operator(), FilterOperator::IsTrue);
    }

    #[test]
    fn test_unknown_type_defaults_to_text() {
        assert_eq!(ColumnType::parse("currency"), ColumnType::Text);
        let parsed: ColumnType = serde_json::from_str("\"number\"").unwrap();
        assert_eq!(parsed, ColumnType::Number);
    }

    #[test]
    fn test_requires_value() {
        assert!(FilterOperator::Equals.requires_value());
        assert!(!FilterOperator::IsNull.requires_value());
        assert!(!FilterOperator::IsTrue.requires_value());
        assert!(FilterOperator::Between.requires_two_values());
        assert!(FilterOperator::DateRange.requires_two_values());
        assert!(!FilterOperator::OnDate.requires_two_values());
    }

    #[test]
    fn test_type_allows() {
        assert!(ColumnType::Number.allows(&FilterOperator::Between));
        assert!(!ColumnType::Text.allows(&FilterOperator::Between));
        assert!(ColumnType::Array.allows(&FilterOperator::NotIn));
    }
}
