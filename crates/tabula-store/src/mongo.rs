//! MongoDB document store
//!
//! Collections map to tables. `_id` is exposed to callers as `id` (ObjectIds
//! as 24-char hex strings). Updates go through `$set` so dotted keys write
//! nested fields natively.

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use serde_json::{Map, Value};
use tabula_core::{
    Result, Row, RowId, RowPage, RowStore, SelectQuery, TabulaError, record_not_found,
};
use tabula_query::mongo::{render_filter, render_sort, to_bson};

/// MongoDB-backed `RowStore`
pub struct MongoStore {
    client: Client,
    database: String,
}

impl MongoStore {
    /// Connect and verify the server is reachable
    #[tracing::instrument(skip(uri))]
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        tracing::debug!("connecting to MongoDB");

        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| TabulaError::Backend(format!("Failed to parse MongoDB options: {}", e)))?;
        let client = Client::with_options(options)
            .map_err(|e| TabulaError::Backend(format!("Failed to create MongoDB client: {}", e)))?;

        client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TabulaError::Backend(format!("Failed to connect to MongoDB: {}", e)))?;

        tracing::info!(database = %database, "MongoDB store connected");
        Ok(Self {
            client,
            database: database.to_string(),
        })
    }

    fn db(&self) -> Database {
        self.client.database(&self.database)
    }

    fn collection(&self, table: &str) -> Collection<Document> {
        self.db().collection(table)
    }
}

#[async_trait]
impl RowStore for MongoStore {
    fn backend_name(&self) -> &str {
        "mongodb"
    }

    #[tracing::instrument(skip(self, query), fields(table = %query.table))]
    async fn select(&self, query: &SelectQuery) -> Result<RowPage> {
        let filter = render_filter(&query.predicates)?;
        let collection = self.collection(&query.table);

        let total_items = collection
            .count_documents(filter.clone())
            .await
            .map_err(mongo_error)?;

        let mut find = collection.find(filter).sort(render_sort(&query.sort));
        if let Some(range) = query.range {
            find = find.skip(range.offset as u64).limit(range.limit as i64);
        }
        let documents: Vec<Document> = find
            .await
            .map_err(mongo_error)?
            .try_collect()
            .await
            .map_err(mongo_error)?;

        Ok(RowPage {
            rows: documents.into_iter().map(document_to_row).collect(),
            total_items,
        })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let document = row_to_document(row)?;
        let result = self
            .collection(table)
            .insert_one(document.clone())
            .await
            .map_err(mongo_error)?;

        let mut stored = document;
        stored.insert("_id", result.inserted_id);
        Ok(document_to_row(stored))
    }

    async fn update(&self, table: &str, id: &RowId, patch: Row) -> Result<Row> {
        let filter = id_filter(id)?;
        let set = set_document(&patch)?;
        let collection = self.collection(table);

        let updated = if set.is_empty() {
            collection.find_one(filter).await.map_err(mongo_error)?
        } else {
            collection
                .find_one_and_update(filter, doc! { "$set": set })
                .return_document(ReturnDocument::After)
                .await
                .map_err(mongo_error)?
        };

        updated
            .map(document_to_row)
            .ok_or_else(|| record_not_found(id))
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let collection = self.collection(table);
        let mut stored = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(id) = row.id() else {
                stored.push(self.insert(table, row).await?);
                continue;
            };
            let set = set_document(&row)?;
            let update = if set.is_empty() {
                doc! { "$setOnInsert": {} }
            } else {
                doc! { "$set": set }
            };
            let document = collection
                .find_one_and_update(id_filter(&id)?, update)
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await
                .map_err(mongo_error)?;
            if let Some(document) = document {
                stored.push(document_to_row(document));
            }
        }

        Ok(stored)
    }

    async fn delete(&self, table: &str, ids: &[RowId]) -> Result<u64> {
        let ids = ids
            .iter()
            .map(|id| to_bson("_id", &id.to_value()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let result = self
            .collection(table)
            .delete_many(doc! { "_id": { "$in": ids } })
            .await
            .map_err(mongo_error)?;
        Ok(result.deleted_count)
    }
}

fn id_filter(id: &RowId) -> Result<Document> {
    Ok(doc! { "_id": to_bson("_id", &id.to_value())? })
}

/// `$set` body for a patch: ids, nulls and empty objects are left out
fn set_document(patch: &Row) -> Result<Document> {
    let mut set = Document::new();
    for (key, value) in patch.iter() {
        if key == "id" || key == "_id" || value.is_null() {
            continue;
        }
        if value.as_object().is_some_and(Map::is_empty) {
            continue;
        }
        set.insert(key.clone(), to_bson(key, value)?);
    }
    Ok(set)
}

/// Row to BSON document, moving `id` to `_id`
pub fn row_to_document(mut row: Row) -> Result<Document> {
    let id = row.remove("id").or_else(|| row.remove("_id"));
    let mut document = bson::to_document(&row)
        .map_err(|e| TabulaError::Backend(format!("Failed to encode document: {}", e)))?;
    if let Some(id) = id.filter(|v| !v.is_null()) {
        document.insert("_id", to_bson("_id", &id)?);
    }
    Ok(document)
}

/// BSON document to row, exposing `_id` as `id`
pub fn document_to_row(document: Document) -> Row {
    let mut row = Row::new();
    for (key, value) in document {
        let key = if key == "_id" { "id".to_string() } else { key };
        row.insert(key, bson_to_json(value));
    }
    row
}

fn bson_to_json(bson: Bson) -> Value {
    match bson {
        Bson::Null | Bson::Undefined | Bson::MaxKey | Bson::MinKey => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(d) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) | Bson::Symbol(s) | Bson::JavaScriptCode(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(k, v)| (k, bson_to_json(v)))
                .collect(),
        ),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        Bson::Timestamp(ts) => Value::from(ts.time),
        Bson::RegularExpression(re) => Value::String(format!("/{}/{}", re.pattern, re.options)),
        Bson::JavaScriptCodeWithScope(code) => Value::String(code.code),
        Bson::Binary(bin) => Value::Array(bin.bytes.into_iter().map(Value::from).collect()),
        Bson::DbPointer(_) => Value::String("<DbPointer>".to_string()),
    }
}

fn mongo_error(e: mongodb::error::Error) -> TabulaError {
    TabulaError::Backend(format!("MongoDB command failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_document_to_row_renames_id() {
        let oid = ObjectId::new();
        let row = document_to_row(doc! {
            "_id": oid,
            "title": "Home",
            "tags": ["a", "b"],
            "meta": { "views": 3_i32 },
        });
        assert_eq!(
            row.into_value(),
            json!({
                "id": oid.to_hex(),
                "title": "Home",
                "tags": ["a", "b"],
                "meta": { "views": 3 },
            })
        );
    }

    #[test]
    fn test_row_to_document_parses_object_ids() {
        let oid = ObjectId::new();
        let row = Row::from_value(json!({"id": oid.to_hex(), "name": "x"})).unwrap();
        let document = row_to_document(row).unwrap();
        assert_eq!(document.get_object_id("_id").ok(), Some(oid));
        assert_eq!(document.get_str("name").ok(), Some("x"));
    }

    #[test]
    fn test_set_document_skips_ids_nulls_and_empty_objects() {
        let patch = Row::from_value(json!({
            "_id": "abc",
            "status": "Done",
            "notes": null,
            "meta": {},
            "address.city": "York"
        }))
        .unwrap();
        let set = set_document(&patch).unwrap();
        assert_eq!(set, doc! { "status": "Done", "address.city": "York" });
    }
}
