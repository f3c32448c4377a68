//! SQLite store tests against a temporary database file

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tabula_core::{Predicate, Range, Row, RowId, RowStore, SelectQuery, SortSpec, TabulaError};
use tabula_store::{MemoryStore, SqliteStore, StoreConfig, open_store};

fn row(value: Value) -> Row {
    Row::from_value(value).unwrap()
}

fn names(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    for (name, score, tags) in [
        ("Anna", 30, json!(["red", "blue"])),
        ("Bob", 10, json!(["green"])),
        ("Diana", 20, json!(["blue"])),
    ] {
        store
            .insert("people", row(json!({"name": name, "score": score, "tags": tags})))
            .await
            .unwrap();
    }
    store
}

#[tokio::test]
async fn test_search_term_matches_case_insensitively() {
    let store = seeded_store().await;
    let query = SelectQuery::new("people").filter(Predicate::contains("name", "an"));
    let page = store.select(&query).await.unwrap();
    assert_eq!(names(&page.rows), vec!["Anna", "Diana"]);
    assert_eq!(page.total_items, 2);
}

#[tokio::test]
async fn test_sort_and_range() {
    let store = seeded_store().await;
    let query = SelectQuery::new("people")
        .sort(SortSpec::new("score", false))
        .range(Range { offset: 1, limit: 5 });
    let page = store.select(&query).await.unwrap();
    assert_eq!(names(&page.rows), vec!["Diana", "Bob"]);
    assert_eq!(page.total_items, 3);
}

#[tokio::test]
async fn test_array_overlap_filter() {
    let store = seeded_store().await;
    let query = SelectQuery::new("people").filter(Predicate::Overlaps {
        column: "tags".into(),
        values: vec![json!("blue")],
    });
    let page = store.select(&query).await.unwrap();
    assert_eq!(names(&page.rows), vec!["Anna", "Diana"]);
}

#[tokio::test]
async fn test_update_merges_nested_keys_and_skips_nulls() {
    let store = seeded_store().await;
    let updated = store
        .update(
            "people",
            &RowId::from(2),
            row(json!({"name": "Robert", "score": null, "address.city": "York"})),
        )
        .await
        .unwrap();

    assert_eq!(
        updated.into_value(),
        json!({"id": 2, "name": "Robert", "score": 10, "tags": ["green"], "address": {"city": "York"}})
    );

    let err = store
        .update("people", &RowId::from(99), row(json!({"name": "x"})))
        .await
        .unwrap_err();
    assert!(matches!(err, TabulaError::NotFound(_)));
}

#[tokio::test]
async fn test_upsert_then_delete() {
    let store = seeded_store().await;
    let stored = store
        .upsert(
            "people",
            vec![row(json!({"id": 1, "score": 31})), row(json!({"id": 10, "name": "Zoe"}))],
        )
        .await
        .unwrap();
    assert_eq!(stored[0].get("score"), Some(&json!(31)));
    assert_eq!(stored[1].id(), Some(RowId::from(10)));

    let removed = store
        .delete("people", &[RowId::from(1), RowId::from(10)])
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let page = store.select(&SelectQuery::new("people")).await.unwrap();
    assert_eq!(page.total_items, 2);
}

#[tokio::test]
async fn test_open_store_with_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::Sqlite {
        path: dir.path().join("tabula.db"),
    };
    let store = open_store(&config).await.unwrap();
    assert_eq!(store.backend_name(), "sqlite");

    let inserted = store.insert("pages", row(json!({"pageUrl": "home"}))).await.unwrap();
    let fetched = store.get("pages", &inserted.id().unwrap()).await.unwrap();
    assert_eq!(fetched, Some(inserted));
}

#[tokio::test]
async fn test_pattern_matches_fold_non_ascii_letters() {
    let sqlite = SqliteStore::in_memory().unwrap();
    let memory = MemoryStore::new();
    for name in ["Élodie", "Ärger", "Bob"] {
        sqlite.insert("people", row(json!({"name": name}))).await.unwrap();
        memory.insert("people", row(json!({"name": name}))).await.unwrap();
    }

    for (needle, expected) in [("éLO", "Élodie"), ("är", "Ärger")] {
        let query = SelectQuery::new("people").filter(Predicate::contains("name", needle));
        let from_sqlite = sqlite.select(&query).await.unwrap();
        let from_memory = memory.select(&query).await.unwrap();
        assert_eq!(names(&from_sqlite.rows), vec![expected]);
        assert_eq!(names(&from_sqlite.rows), names(&from_memory.rows));
    }
}
