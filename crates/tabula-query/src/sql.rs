//! SQL rendering for SQLite-backed tables
//!
//! Produces parameterized statements (`?` placeholders) so filter values are
//! never spliced into SQL text. Identifiers are validated instead of escaped.
//!
//! Two table shapes are supported:
//! - plain columns (`"status"`), with one level of JSON nesting via
//!   `json_extract("customer", '$.name')`
//! - a document column holding the whole row as JSON, where every field but
//!   `id` is read with `json_extract("doc", '$.status')`

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tabula_core::{LikePattern, Predicate, SelectQuery};

use crate::TranslateError;

/// Unicode-aware lowercase function a connection may register; SQLite's
/// built-in `LOWER` only folds ASCII letters
pub const UNICODE_LOWER: &str = "tabula_lower";

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// A statement plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct SqlRenderer {
    document_column: Option<String>,
    lower_function: String,
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::columns()
    }
}

impl SqlRenderer {
    /// Renderer for tables with one SQL column per field
    pub fn columns() -> Self {
        Self {
            document_column: None,
            lower_function: "LOWER".to_string(),
        }
    }

    /// Renderer for tables storing each row as JSON in `column`
    pub fn document(column: impl Into<String>) -> Self {
        Self {
            document_column: Some(column.into()),
            lower_function: "LOWER".to_string(),
        }
    }

    /// Fold text with `function` instead of `LOWER` in pattern matches.
    /// The connection must have a one-argument scalar function of that name.
    pub fn with_lower_function(mut self, function: impl Into<String>) -> Self {
        self.lower_function = function.into();
        self
    }

    /// `SELECT` for one page of rows
    pub fn render_select(&self, query: &SelectQuery) -> Result<SqlStatement, TranslateError> {
        let table = quote_identifier(&query.table)?;
        let (where_clause, params) = self.render_where(&query.predicates)?;

        let select_list = match &self.document_column {
            Some(doc) => format!("\"id\", {}", quote_identifier(doc)?),
            None => "*".to_string(),
        };

        let direction = if query.sort.ascending { "ASC" } else { "DESC" };
        let order_by = if query.sort.column == "id" {
            format!(" ORDER BY \"id\" {}", direction)
        } else {
            format!(
                " ORDER BY {} COLLATE NOCASE {}, \"id\" ASC",
                self.column_expr(&query.sort.column)?,
                direction
            )
        };

        let limit_clause = match query.range {
            Some(range) => format!(" LIMIT {} OFFSET {}", range.limit, range.offset),
            None => String::new(),
        };

        Ok(SqlStatement {
            sql: format!(
                "SELECT {} FROM {}{}{}{}",
                select_list, table, where_clause, order_by, limit_clause
            ),
            params,
        })
    }

    /// `SELECT COUNT(*)` over the same predicates, ignoring range and sort
    pub fn render_count(&self, query: &SelectQuery) -> Result<SqlStatement, TranslateError> {
        let table = quote_identifier(&query.table)?;
        let (where_clause, params) = self.render_where(&query.predicates)?;
        Ok(SqlStatement {
            sql: format!("SELECT COUNT(*) FROM {}{}", table, where_clause),
            params,
        })
    }

    /// ` WHERE a AND b ...`, or an empty string when there are no predicates
    pub fn render_where(
        &self,
        predicates: &[Predicate],
    ) -> Result<(String, Vec<Value>), TranslateError> {
        if predicates.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let mut params = Vec::new();
        let mut fragments = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            fragments.push(self.render_predicate(predicate, &mut params)?);
        }

        Ok((format!(" WHERE {}", fragments.join(" AND ")), params))
    }

    fn render_predicate(
        &self,
        predicate: &Predicate,
        params: &mut Vec<Value>,
    ) -> Result<String, TranslateError> {
        let expr = self.column_expr(predicate.column())?;

        let fragment = match predicate {
            Predicate::Compare { op, value, .. } => {
                params.push(value.clone());
                format!("{} {} ?", expr, op.as_sql())
            }
            Predicate::Like {
                pattern,
                needle,
                negated,
                ..
            } => {
                params.push(Value::String(like_pattern(*pattern, needle)));
                let not = if *negated { "NOT " } else { "" };
                format!(
                    "{}(CAST({} AS TEXT)) {}LIKE ? ESCAPE '\\'",
                    self.lower_function, expr, not
                )
            }
            Predicate::Between { low, high, .. } => {
                params.push(low.clone());
                params.push(high.clone());
                format!("{} BETWEEN ? AND ?", expr)
            }
            Predicate::In {
                values, negated, ..
            } => {
                if values.is_empty() {
                    return Ok(if *negated {
                        format!("{} IS NOT NULL", expr)
                    } else {
                        "0 = 1".to_string()
                    });
                }
                params.extend(values.iter().cloned());
                let not = if *negated { "NOT " } else { "" };
                format!("{} {}IN ({})", expr, not, placeholders(values.len()))
            }
            Predicate::Overlaps { column, values } => {
                if values.is_empty() {
                    return Ok("0 = 1".to_string());
                }
                params.extend(values.iter().cloned());
                format!(
                    "EXISTS (SELECT 1 FROM {} WHERE json_each.value IN ({}))",
                    self.array_source(column)?,
                    placeholders(values.len())
                )
            }
            Predicate::ContainsAll { column, values } => {
                let mut distinct: Vec<Value> = Vec::with_capacity(values.len());
                for value in values {
                    if !distinct.contains(value) {
                        distinct.push(value.clone());
                    }
                }
                if distinct.is_empty() {
                    return Ok("1 = 1".to_string());
                }
                let count = distinct.len();
                params.extend(distinct);
                format!(
                    "(SELECT COUNT(DISTINCT json_each.value) FROM {} WHERE json_each.value IN ({})) = {}",
                    self.array_source(column)?,
                    placeholders(count),
                    count
                )
            }
            Predicate::IsNull { negated, .. } => {
                if *negated {
                    format!("{} IS NOT NULL", expr)
                } else {
                    format!("{} IS NULL", expr)
                }
            }
        };

        Ok(fragment)
    }

    /// SQL expression reading a field by accessor path
    fn column_expr(&self, path: &str) -> Result<String, TranslateError> {
        let segments = split_path(path)?;

        match &self.document_column {
            Some(_) if path == "id" => Ok("\"id\"".to_string()),
            Some(doc) => Ok(format!(
                "json_extract({}, '$.{}')",
                quote_identifier(doc)?,
                segments.join(".")
            )),
            None => match segments.as_slice() {
                [column] => quote_identifier(column),
                [column, field] => Ok(format!(
                    "json_extract({}, '$.{}')",
                    quote_identifier(column)?,
                    field
                )),
                _ => Err(TranslateError::InvalidIdentifier(path.to_string())),
            },
        }
    }

    /// Table-valued `json_each(..)` over an array field
    fn array_source(&self, path: &str) -> Result<String, TranslateError> {
        let segments = split_path(path)?;

        match &self.document_column {
            Some(doc) => Ok(format!(
                "json_each({}, '$.{}')",
                quote_identifier(doc)?,
                segments.join(".")
            )),
            None => match segments.as_slice() {
                [column] => Ok(format!("json_each({})", quote_identifier(column)?)),
                [column, field] => Ok(format!(
                    "json_each({}, '$.{}')",
                    quote_identifier(column)?,
                    field
                )),
                _ => Err(TranslateError::InvalidIdentifier(path.to_string())),
            },
        }
    }
}

/// Quote a table or column name after checking it is a plain identifier
pub fn quote_identifier(name: &str) -> Result<String, TranslateError> {
    if IDENTIFIER.is_match(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(TranslateError::InvalidIdentifier(name.to_string()))
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, TranslateError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() > 2 || segments.iter().any(|s| !IDENTIFIER.is_match(s)) {
        return Err(TranslateError::InvalidIdentifier(path.to_string()));
    }
    Ok(segments)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Lowercased LIKE pattern with `%`, `_` and `\` escaped in the needle
fn like_pattern(pattern: LikePattern, needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    pattern.wrap(&escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabula_core::{CompareOp, Range, SortSpec};

    #[test]
    fn test_select_with_filters_sort_and_range() {
        let query = SelectQuery::new("orders")
            .filter(Predicate::eq("status", "Active"))
            .filter(Predicate::contains("customer.name", "an"))
            .sort(SortSpec::new("total", false))
            .range(Range::for_page(3, 10));

        let statement = SqlRenderer::columns().render_select(&query).unwrap();

        assert_eq!(
            statement.sql,
            "SELECT * FROM \"orders\" WHERE \"status\" = ? AND LOWER(CAST(json_extract(\"customer\", '$.name') AS TEXT)) LIKE ? ESCAPE '\\' ORDER BY \"total\" COLLATE NOCASE DESC, \"id\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(statement.params, vec![json!("Active"), json!("%an%")]);
    }

    #[test]
    fn test_document_mode_reads_fields_with_json_extract() {
        let query = SelectQuery::new("pages").filter(Predicate::Compare {
            column: "views".into(),
            op: CompareOp::Gt,
            value: json!(10),
        });

        let statement = SqlRenderer::document("doc").render_select(&query).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT \"id\", \"doc\" FROM \"pages\" WHERE json_extract(\"doc\", '$.views') > ? ORDER BY \"id\" ASC"
        );

        let count = SqlRenderer::document("doc").render_count(&query).unwrap();
        assert_eq!(
            count.sql,
            "SELECT COUNT(*) FROM \"pages\" WHERE json_extract(\"doc\", '$.views') > ?"
        );
    }

    #[test]
    fn test_like_needle_is_escaped() {
        let query = SelectQuery::new("t").filter(Predicate::Like {
            column: "code".into(),
            pattern: LikePattern::StartsWith,
            needle: "50%_Off".into(),
            negated: true,
        });
        let statement = SqlRenderer::columns().render_select(&query).unwrap();
        assert!(statement.sql.contains("NOT LIKE ?"));
        assert_eq!(statement.params, vec![json!("50\\%\\_off%")]);
    }

    #[test]
    fn test_custom_lower_function() {
        let query = SelectQuery::new("people").filter(Predicate::contains("name", "éLO"));
        let statement = SqlRenderer::document("doc")
            .with_lower_function(UNICODE_LOWER)
            .render_where(&query.predicates)
            .unwrap();
        assert_eq!(
            statement.0,
            " WHERE tabula_lower(CAST(json_extract(\"doc\", '$.name') AS TEXT)) LIKE ? ESCAPE '\\'"
        );
        assert_eq!(statement.1, vec![json!("%élo%")]);
    }

    #[test]
    fn test_array_predicates() {
        let query = SelectQuery::new("t")
            .filter(Predicate::Overlaps {
                column: "tags".into(),
                values: vec![json!("a"), json!("b")],
            })
            .filter(Predicate::ContainsAll {
                column: "tags".into(),
                values: vec![json!("a"), json!("a"), json!("c")],
            });
        let (where_clause, params) = SqlRenderer::columns().render_where(&query.predicates).unwrap();
        assert_eq!(
            where_clause,
            " WHERE EXISTS (SELECT 1 FROM json_each(\"tags\") WHERE json_each.value IN (?, ?)) AND (SELECT COUNT(DISTINCT json_each.value) FROM json_each(\"tags\") WHERE json_each.value IN (?, ?)) = 2"
        );
        assert_eq!(params, vec![json!("a"), json!("b"), json!("a"), json!("c")]);
    }

    #[test]
    fn test_empty_in_lists() {
        let renderer = SqlRenderer::columns();
        let (clause, params) = renderer
            .render_where(&[Predicate::In {
                column: "id".into(),
                values: vec![],
                negated: false,
            }])
            .unwrap();
        assert_eq!(clause, " WHERE 0 = 1");
        assert!(params.is_empty());

        let (clause, _) = renderer
            .render_where(&[Predicate::In {
                column: "status".into(),
                values: vec![],
                negated: true,
            }])
            .unwrap();
        assert_eq!(clause, " WHERE \"status\" IS NOT NULL");
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        let query = SelectQuery::new("orders; DROP TABLE x");
        assert!(matches!(
            SqlRenderer::columns().render_select(&query),
            Err(TranslateError::InvalidIdentifier(_))
        ));

        let query = SelectQuery::new("orders").filter(Predicate::eq("a.b.c", 1));
        assert!(SqlRenderer::columns().render_select(&query).is_err());
    }
}
