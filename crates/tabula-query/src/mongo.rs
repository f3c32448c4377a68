//! MongoDB filter documents
//!
//! Renders predicates into the query language used by `find`/`count`
//! commands. The `id` column maps to `_id`; 24-hex string ids become
//! `ObjectId`s.

use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use serde_json::Value;
use tabula_core::{CompareOp, LikePattern, Predicate, SortSpec};

use crate::TranslateError;

/// Field name as stored in MongoDB
pub fn field_name(column: &str) -> &str {
    if column == "id" { "_id" } else { column }
}

/// Convert a JSON value to BSON, turning ObjectId-shaped strings on `_id`
/// into real ObjectIds
pub fn to_bson(field: &str, value: &Value) -> Result<Bson, TranslateError> {
    if field == "_id"
        && let Value::String(s) = value
        && let Ok(oid) = ObjectId::parse_str(s)
    {
        return Ok(Bson::ObjectId(oid));
    }
    bson::to_bson(value).map_err(|e| TranslateError::InvalidValue {
        column: field.to_string(),
        message: e.to_string(),
    })
}

fn to_bson_list(field: &str, values: &[Value]) -> Result<Vec<Bson>, TranslateError> {
    values.iter().map(|v| to_bson(field, v)).collect()
}

/// Filter document for a predicate list (implicit AND)
pub fn render_filter(predicates: &[Predicate]) -> Result<Document, TranslateError> {
    let mut clauses = predicates
        .iter()
        .map(render_predicate)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses.into_iter().map(Bson::Document).collect::<Vec<_>>() },
    })
}

fn render_predicate(predicate: &Predicate) -> Result<Document, TranslateError> {
    let field = field_name(predicate.column());

    let condition: Bson = match predicate {
        Predicate::Compare { op, value, .. } => {
            let value = to_bson(field, value)?;
            match op {
                CompareOp::Eq => value,
                // Missing and null fields never satisfy a comparison
                CompareOp::Ne => Bson::Document(doc! { "$nin": [value, Bson::Null] }),
                CompareOp::Gt => Bson::Document(doc! { "$gt": value }),
                CompareOp::Gte => Bson::Document(doc! { "$gte": value }),
                CompareOp::Lt => Bson::Document(doc! { "$lt": value }),
                CompareOp::Lte => Bson::Document(doc! { "$lte": value }),
            }
        }
        Predicate::Like {
            pattern,
            needle,
            negated,
            ..
        } => {
            let pattern = regex_pattern(*pattern, needle);
            if *negated {
                Bson::Document(doc! {
                    "$not": Bson::RegularExpression(bson::Regex {
                        pattern,
                        options: "i".to_string(),
                    }),
                    "$ne": Bson::Null,
                })
            } else {
                Bson::Document(doc! { "$regex": pattern, "$options": "i" })
            }
        }
        Predicate::Between { low, high, .. } => Bson::Document(doc! {
            "$gte": to_bson(field, low)?,
            "$lte": to_bson(field, high)?,
        }),
        Predicate::In {
            values, negated, ..
        } => {
            let values = to_bson_list(field, values)?;
            if *negated {
                Bson::Document(doc! { "$nin": values, "$ne": Bson::Null })
            } else {
                Bson::Document(doc! { "$in": values })
            }
        }
        Predicate::Overlaps { values, .. } => {
            Bson::Document(doc! { "$in": to_bson_list(field, values)? })
        }
        Predicate::ContainsAll { values, .. } => {
            Bson::Document(doc! { "$all": to_bson_list(field, values)? })
        }
        Predicate::IsNull { negated, .. } => {
            if *negated {
                Bson::Document(doc! { "$ne": Bson::Null })
            } else {
                Bson::Null
            }
        }
    };

    let mut document = Document::new();
    document.insert(field, condition);
    Ok(document)
}

/// Sort document, with `_id` as tie-breaker
pub fn render_sort(sort: &SortSpec) -> Document {
    let direction = if sort.ascending { 1 } else { -1 };
    let field = field_name(&sort.column);
    let mut document = doc! { field: direction };
    if field != "_id" {
        document.insert("_id", 1);
    }
    document
}

fn regex_pattern(pattern: LikePattern, needle: &str) -> String {
    let escaped = regex::escape(needle);
    match pattern {
        LikePattern::Contains => escaped,
        LikePattern::StartsWith => format!("^{}", escaped),
        LikePattern::EndsWith => format!("{}$", escaped),
    }
}
