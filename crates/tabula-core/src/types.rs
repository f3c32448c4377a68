//! Core types for Tabula

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of a row as assigned by the backend.
///
/// Backends use integers (SQLite), object ids (MongoDB) or anything else;
/// the id is always carried as its string form and converted back by the
/// store that owns it. On the wire it is a number when it looks like one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse an id out of a JSON value. Only strings and numbers are ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// The id as a JSON value, numeric when it looks like an integer
    pub fn to_value(&self) -> Value {
        match self.0.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(self.0.clone()),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RowId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("row id must be a non-empty string or a number"))
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// A single record. Keys are column names; values are arbitrary JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a row from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The row's identity: `id`, falling back to `_id`
    pub fn id(&self) -> Option<RowId> {
        self.0
            .get("id")
            .and_then(RowId::from_value)
            .or_else(|| self.0.get("_id").and_then(RowId::from_value))
    }

    /// Read a value by accessor path. One level of nesting is supported
    /// (`customer.name`); a direct key containing a dot wins over the path.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let (head, tail) = path.split_once('.')?;
        self.0.get(head)?.as_object()?.get(tail)
    }

    /// Write a value by accessor path, creating the parent object if needed
    pub fn set_path(&mut self, path: &str, value: Value) {
        match path.split_once('.') {
            Some((head, tail)) => {
                let entry = self
                    .0
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(inner) = entry {
                    inner.insert(tail.to_string(), value);
                }
            }
            None => {
                self.0.insert(path.to_string(), value);
            }
        }
    }

    /// Shallow merge: every key of `other` overwrites the same key here
    pub fn merge(&mut self, other: &Row) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Apply an update patch in place.
    ///
    /// - `id` / `_id` keys in the patch are ignored
    /// - null values are skipped
    /// - empty objects are skipped
    /// - `a.b` keys write into the nested object `a`
    ///
    /// Returns the number of fields written.
    pub fn apply_patch(&mut self, patch: &Row) -> usize {
        let mut written = 0;
        for (key, value) in patch.iter() {
            if key == "id" || key == "_id" {
                continue;
            }
            if value.is_null() {
                continue;
            }
            if value.as_object().is_some_and(Map::is_empty) {
                continue;
            }
            self.set_path(key, value.clone());
            written += 1;
        }
        written
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(value: Value) -> Row {
        Row::from_value(value).unwrap()
    }

    #[test]
    fn test_id_falls_back_to_underscore_id() {
        assert_eq!(row(json!({"id": 7})).id(), Some(RowId::from(7)));
        assert_eq!(row(json!({"_id": "abc"})).id(), Some(RowId::from("abc")));
        assert_eq!(row(json!({"name": "x"})).id(), None);
        assert_eq!(row(json!({"id": ""})).id(), None);
    }

    #[test]
    fn test_get_path_one_level() {
        let r = row(json!({"customer": {"name": "Ada"}, "a.b": 1}));
        assert_eq!(r.get_path("customer.name"), Some(&json!("Ada")));
        assert_eq!(r.get_path("a.b"), Some(&json!(1)));
        assert_eq!(r.get_path("customer.email"), None);
        assert_eq!(r.get_path("missing"), None);
    }

    #[test]
    fn test_apply_patch_rules() {
        let mut target = row(json!({"id": 1, "name": "Old", "address": {"city": "Leeds", "zip": "LS1"}}));
        let patch = row(json!({
            "id": 99,
            "name": "New",
            "note": null,
            "meta": {},
            "address.city": "York"
        }));

        let written = target.apply_patch(&patch);

        assert_eq!(written, 2);
        assert_eq!(
            target.into_value(),
            json!({"id": 1, "name": "New", "address": {"city": "York", "zip": "LS1"}})
        );
    }

    #[test]
    fn test_set_path_replaces_scalar_parent() {
        let mut target = row(json!({"a": 5}));
        target.set_path("a.b", json!(true));
        assert_eq!(target.into_value(), json!({"a": {"b": true}}));
    }

    #[test]
    fn test_row_id_to_value() {
        assert_eq!(RowId::new("12").to_value(), json!(12));
        assert_eq!(RowId::new("65a1").to_value(), json!("65a1"));
    }
}
