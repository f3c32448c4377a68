//! Integration tests for TableOrchestrator

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockStore, StoreOp, numbered_users, three_users, users_config};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tabula_core::{RowId, RowStore, SortSpec, TabulaError};
use tabula_query::{FilterOperator, FilterValue};
use tabula_table::{
    CollectingSink, EventLog, FilterField, LoadStatus, NotificationLevel, SavedFilter,
    SavedFilterRepository, SortingState, TableEvent, TableOrchestrator, TableView, search_input,
};

fn names(table: &TableOrchestrator) -> Vec<String> {
    table
        .rows()
        .iter()
        .map(|r| r.get("name").and_then(Value::as_str).unwrap_or_default().to_string())
        .collect()
}

fn orchestrator(store: Arc<MockStore>) -> (TableOrchestrator, CollectingSink) {
    let sink = CollectingSink::new();
    let table = TableOrchestrator::new(users_config(), store).with_notifier(Arc::new(sink.clone()));
    (table, sink)
}

fn last_select(store: &MockStore) -> tabula_core::SelectQuery {
    store
        .ops()
        .into_iter()
        .rev()
        .find_map(|op| match op {
            StoreOp::Select(query) => Some(query),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn test_initial_fetch_populates_rows_and_totals() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, _) = orchestrator(store.clone());
    assert_eq!(table.status(), LoadStatus::Idle);

    table.refresh().await.unwrap();

    assert_eq!(table.status(), LoadStatus::Ready);
    assert_eq!(names(&table), vec!["Anna", "Bob", "Diana"]);
    assert_eq!(table.pagination().total_items, 3);
    assert_eq!(table.pagination().total_pages, 1);
    assert_eq!(last_select(&store).sort, SortSpec::new("id", true));
}

#[tokio::test]
async fn test_page_index_two_returns_last_five_rows() {
    let store = Arc::new(MockStore::new().with_rows("users", numbered_users(25)));
    let (mut table, _) = orchestrator(store.clone());
    table.refresh().await.unwrap();

    table.set_page_index(2).await.unwrap();

    assert_eq!(
        names(&table),
        vec!["User 21", "User 22", "User 23", "User 24", "User 25"]
    );
    assert_eq!(table.pagination().total_pages, 3);
    assert_eq!(table.pagination().total_items, 25);
    assert_eq!(table.fetch_request().pagination.page, 3);
}

#[tokio::test]
async fn test_status_filter_returns_matching_rows() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, _) = orchestrator(store);

    let index = table.add_filter();
    table
        .update_filter(index, FilterField::Column, json!("status"))
        .unwrap();
    table
        .update_filter(index, FilterField::Value, json!("Active"))
        .unwrap();
    let dropped = table.apply_filters().await.unwrap();

    assert!(dropped.is_empty());
    assert_eq!(names(&table), vec!["Anna", "Diana"]);
    assert_eq!(table.pagination().total_items, 2);

    table.clear_filters().await.unwrap();
    assert_eq!(table.pagination().total_items, 3);
}

#[tokio::test]
async fn test_search_matches_substring_case_insensitively() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, _) = orchestrator(store);

    table.set_search("an").await.unwrap();

    assert_eq!(names(&table), vec!["Anna", "Diana"]);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_search_fetches_once_for_a_burst() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (table, _) = orchestrator(store.clone());
    let table = Arc::new(tokio::sync::Mutex::new(table));

    let first = tokio::spawn({
        let table = Arc::clone(&table);
        async move { search_input(&table, "a").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = tokio::spawn({
        let table = Arc::clone(&table);
        async move { search_input(&table, "an").await }
    });

    assert!(!first.await.unwrap().unwrap());
    assert!(second.await.unwrap().unwrap());

    let selects = store
        .ops()
        .iter()
        .filter(|op| matches!(op, StoreOp::Select(_)))
        .count();
    assert_eq!(selects, 1);
    assert_eq!(names(&*table.lock().await), vec!["Anna", "Diana"]);
}

#[tokio::test]
async fn test_sort_cycle_returns_to_default() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, _) = orchestrator(store.clone());

    table.toggle_sort("name").await.unwrap();
    assert_eq!(last_select(&store).sort, SortSpec::new("name", true));

    table.toggle_sort("name").await.unwrap();
    assert_eq!(names(&table), vec!["Diana", "Bob", "Anna"]);

    table.toggle_sort("name").await.unwrap();
    assert_eq!(table.sorting(), &SortingState::default());
    assert_eq!(last_select(&store).sort, SortSpec::new("id", true));

    table.toggle_sort("name").await.unwrap();
    assert_eq!(table.sorting(), &SortingState::ascending("name"));
}

#[tokio::test]
async fn test_unsortable_column_is_rejected() {
    let store = Arc::new(MockStore::new());
    let (mut table, _) = orchestrator(store.clone());

    let err = table.toggle_sort("email").await.unwrap_err();
    assert!(matches!(err, TabulaError::Validation(_)));
    assert!(store.ops().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_clears_rows_and_sets_error() {
    let store = Arc::new(MockStore::new().with_failure());
    let (mut table, _) = orchestrator(store);

    assert!(table.refresh().await.is_err());
    assert_eq!(table.status(), LoadStatus::Ready);
    assert_eq!(table.error(), Some("mock store unavailable"));
    assert!(table.rows().is_empty());
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let events = EventLog::new();
    let (table, _) = orchestrator(store.clone());
    let mut table = table.with_listener(Arc::new(events.clone()));

    let stale = table.begin_fetch();
    let current = table.begin_fetch();
    let query = table.build_query().unwrap();
    let page = store.select(&query).await.unwrap();

    assert!(table.complete_fetch(current, Ok(page)));
    assert!(!table.complete_fetch(stale, Err(TabulaError::backend("late failure"))));

    assert_eq!(table.rows().len(), 3);
    assert_eq!(table.error(), None);
    assert!(events.events().contains(&TableEvent::StaleResponseDiscarded {
        generation: stale,
        current
    }));
}

#[tokio::test]
async fn test_batch_commit_keeps_successes_and_reports_one_error() {
    let store = Arc::new(
        MockStore::new()
            .with_rows("users", three_users())
            .with_failing_ids([2]),
    );
    let (table, sink) = orchestrator(store.clone());
    let mut table = table.with_commit_concurrency(2);
    table.refresh().await.unwrap();

    table.commit_cell(0, "name", json!("Annie")).unwrap();
    table.commit_cell(1, "name", json!("Robert")).unwrap();
    table.commit_cell(2, "age", json!("28")).unwrap();
    assert_eq!(table.pending_edits().len(), 3);

    let report = table.save_pending_edits().await.unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    let order: Vec<_> = report.outcomes.iter().map(|o| o.row_index).collect();
    assert_eq!(order, vec![0, 1, 2]);

    assert_eq!(names(&table), vec!["Annie", "Bob", "Diana"]);
    assert_eq!(table.rows()[2].get("age"), Some(&json!(28)));
    assert!(table.pending_edits().is_pending(1, "name"));
    assert_eq!(table.pending_edits().len(), 1);

    let notifications = sink.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
    assert!(!table.is_operation_loading());
}

#[tokio::test]
async fn test_invalid_cell_is_not_queued() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, _) = orchestrator(store);
    table.refresh().await.unwrap();

    assert!(table.commit_cell(0, "age", json!("old")).is_err());
    assert!(table.commit_cell(0, "email", json!("x@y.z")).is_err());
    assert!(!table.commit_cell(0, "name", json!("Anna")).unwrap());
    assert!(table.pending_edits().is_empty());
}

#[tokio::test]
async fn test_page_change_clears_selection() {
    let store = Arc::new(MockStore::new().with_rows("users", numbered_users(15)));
    let (mut table, _) = orchestrator(store);
    table.refresh().await.unwrap();

    table.toggle_selection(1).unwrap();
    table.toggle_selection(3).unwrap();
    assert_eq!(table.selection().len(), 2);

    table.next_page().await.unwrap();
    assert!(table.selection().is_empty());
    assert_eq!(names(&table).len(), 5);
}

#[tokio::test]
async fn test_bulk_edit_and_bulk_delete() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, sink) = orchestrator(store.clone());
    table.refresh().await.unwrap();

    table.toggle_selection(0).unwrap();
    table.toggle_selection(1).unwrap();
    let updated = table.bulk_edit("status", json!("Suspended")).await.unwrap();
    assert_eq!(updated, 2);
    assert_eq!(table.rows()[1].get("status"), Some(&json!("Suspended")));
    assert!(table.selection().is_empty());

    table.toggle_selection(2).unwrap();
    let deleted = table.bulk_delete().await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(names(&table), vec!["Anna", "Bob"]);
    assert_eq!(sink.errors().len(), 0);
    assert!(store.ops().contains(&StoreOp::Delete(
        "users".into(),
        vec![RowId::from(3)]
    )));
}

#[tokio::test]
async fn test_bulk_edit_requires_selection() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, _) = orchestrator(store);
    table.refresh().await.unwrap();

    let err = table.bulk_edit("status", json!("Active")).await.unwrap_err();
    assert_eq!(err.to_string(), "No rows selected");
}

#[tokio::test]
async fn test_failed_update_leaves_rows_unchanged() {
    let store = Arc::new(
        MockStore::new()
            .with_rows("users", three_users())
            .with_failing_ids([1]),
    );
    let (mut table, sink) = orchestrator(store);
    table.refresh().await.unwrap();

    let patch = tabula_core::Row::new().with("name", "Zed");
    assert!(table.update_row(0, patch).await.is_err());
    assert_eq!(names(&table), vec!["Anna", "Bob", "Diana"]);
    assert_eq!(sink.errors().len(), 1);
}

#[tokio::test]
async fn test_add_and_delete_row() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, sink) = orchestrator(store);
    table.refresh().await.unwrap();

    let row = tabula_core::Row::new().with("name", "Eve").with("status", "Active");
    let added = table.add_row(row).await.unwrap();
    assert_eq!(added.id(), Some(RowId::from(4)));
    assert_eq!(table.pagination().total_items, 4);

    table.delete_row(0).await.unwrap();
    assert_eq!(names(&table), vec!["Bob", "Diana", "Eve"]);
    assert_eq!(sink.notifications().len(), 2);
}

#[tokio::test]
async fn test_kanban_move_persists_only_status() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let (mut table, _) = orchestrator(store.clone());
    table.set_view(TableView::Kanban).await.unwrap();

    table.move_kanban_card("1", "Active", 1).await.unwrap();
    assert!(!store.ops().iter().any(|op| matches!(op, StoreOp::Update(..))));

    table.move_kanban_card("2", "Suspended", 0).await.unwrap();
    let stored = store.rows("users");
    assert_eq!(stored[1].get("status"), Some(&json!("Suspended")));
    assert_eq!(stored[1].get("name"), Some(&json!("Bob")));
    let board = table.kanban().unwrap();
    assert_eq!(board.column("Suspended").unwrap().cards[0].id, "2");
}

#[tokio::test]
async fn test_lookups_resolve_foreign_ids() {
    let mut config = users_config();
    config.columns.push(
        tabula_table::TableColumn::new("team_id", tabula_query::ColumnType::Select)
            .with_populate("teams", "title"),
    );
    let store = Arc::new(
        MockStore::new()
            .with_rows(
                "users",
                vec![json!({"name": "Anna", "team_id": 2})],
            )
            .with_rows("teams", vec![json!({"title": "Core"}), json!({"title": "Platform"})]),
    );
    let mut table = TableOrchestrator::new(config, store);

    assert_eq!(table.load_lookups().await, 1);
    table.refresh().await.unwrap();
    assert_eq!(table.cell_text(0, "team_id").as_deref(), Some("Platform"));
}

#[tokio::test]
async fn test_saved_filter_round_trip() {
    let store = Arc::new(MockStore::new().with_rows("users", three_users()));
    let repository = SavedFilterRepository::new(store.clone());
    let (mut table, _) = orchestrator(store);

    let empty = SavedFilter::new("Nothing", "users", "sam", vec![], SortingState::default());
    assert!(matches!(
        repository.save(empty).await,
        Err(TabulaError::Validation(_))
    ));

    let saved = repository
        .save(SavedFilter::new(
            "Active by name",
            "users",
            "sam",
            vec![FilterValue::new("status", FilterOperator::Equals, "Active")],
            SortingState {
                column: Some("name".into()),
                direction: Some(tabula_table::SortDirection::Desc),
            },
        ))
        .await
        .unwrap();

    let listed = repository.list("users", "sam").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);
    assert!(repository.list("users", "alex").await.unwrap().is_empty());

    repository.apply(&listed[0], &mut table).await.unwrap();
    assert_eq!(names(&table), vec!["Diana", "Anna"]);

    let id = saved.id.unwrap();
    repository.delete(&id).await.unwrap();
    assert!(matches!(
        repository.get(&id).await,
        Err(TabulaError::NotFound(_))
    ));
}
