//! Table orchestrator
//!
//! Owns the state of one table view and turns every state change into a
//! single backend fetch. Fetches carry a generation number; a response that
//! arrives after a newer fetch started is discarded.
//!
//! Mutations never touch displayed rows before the backend confirms them, so
//! a failure needs no rollback: the user is notified and the page stays as it
//! was.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tabula_core::{Result, Row, RowId, RowPage, RowStore, SelectQuery, TabulaError};
use tabula_query::{FilterValue, PredicateTranslator};

use crate::config::TableConfig;
use crate::debounce::{DebounceTicket, Debouncer};
use crate::error::TableError;
use crate::events::{Notification, NotificationSink, TableEvent, TableEventListener, TracingSink};
use crate::format::format_cell;
use crate::kanban::{self, KanbanBoard};
use crate::lookup::{self, LookupResults};
use crate::protocol::{FetchRequest, PageRequest, SearchRequest, TablePage};
use crate::state::{
    DroppedFilter, FilterField, FilterState, PaginationState, PendingEdits, SearchState, Selection,
    SortingState,
};

/// Inline edits committed at once during a save
pub const DEFAULT_COMMIT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableView {
    #[default]
    Table,
    Kanban,
}

/// Result of committing one row's pending edits
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub row_index: usize,
    pub id: Option<RowId>,
    pub result: std::result::Result<Row, String>,
}

/// Per-row results of a batch commit, in row order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

pub struct TableOrchestrator {
    config: Arc<TableConfig>,
    store: Arc<dyn RowStore>,
    translator: PredicateTranslator,
    notifier: Arc<dyn NotificationSink>,
    listener: Option<Arc<dyn TableEventListener>>,
    commit_concurrency: usize,
    debouncer: Debouncer,

    status: LoadStatus,
    operation_loading: bool,
    error: Option<String>,
    rows: Vec<Row>,
    generation: u64,

    filters: FilterState,
    sorting: SortingState,
    search: SearchState,
    pagination: PaginationState,
    selection: Selection,
    edits: PendingEdits,
    editing: Option<(usize, String)>,
    lookups: LookupResults,
    view: TableView,
    kanban: Option<KanbanBoard>,
}

impl TableOrchestrator {
    pub fn new(config: impl Into<Arc<TableConfig>>, store: Arc<dyn RowStore>) -> Self {
        let config = config.into();
        let pagination = PaginationState::new(config.page_size());
        let selection = Selection::new(config.select_mode().unwrap_or_default());
        Self {
            config,
            store,
            translator: PredicateTranslator::new(),
            notifier: Arc::new(TracingSink),
            listener: None,
            commit_concurrency: DEFAULT_COMMIT_CONCURRENCY,
            debouncer: Debouncer::default(),
            status: LoadStatus::Idle,
            operation_loading: false,
            error: None,
            rows: Vec::new(),
            generation: 0,
            filters: FilterState::new(),
            sorting: SortingState::new(),
            search: SearchState::new(),
            pagination,
            selection,
            edits: PendingEdits::new(),
            editing: None,
            lookups: LookupResults::new(),
            view: TableView::Table,
            kanban: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn TableEventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_translator(mut self, translator: PredicateTranslator) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_commit_concurrency(mut self, limit: usize) -> Self {
        self.commit_concurrency = limit.max(1);
        self
    }

    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    // Accessors

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_operation_loading(&self) -> bool {
        self.operation_loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sorting(&self) -> &SortingState {
        &self.sorting
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pending_edits(&self) -> &PendingEdits {
        &self.edits
    }

    pub fn editing(&self) -> Option<(usize, &str)> {
        self.editing.as_ref().map(|(row, col)| (*row, col.as_str()))
    }

    pub fn lookups(&self) -> &LookupResults {
        &self.lookups
    }

    pub fn view(&self) -> TableView {
        self.view
    }

    pub fn kanban(&self) -> Option<&KanbanBoard> {
        self.kanban.as_ref()
    }

    fn table(&self) -> &str {
        self.config.table_name()
    }

    fn emit(&self, event: TableEvent) {
        if let Some(listener) = &self.listener {
            listener.on_event(&event);
        }
    }

    // Fetching

    /// The request the current state serializes to
    pub fn fetch_request(&self) -> FetchRequest {
        let search = (!self.search.term().trim().is_empty()).then(|| SearchRequest {
            search_column: self.config.search_column().to_string(),
            search_query: self.search.term().to_string(),
        });
        FetchRequest {
            pagination: PageRequest {
                page: self.pagination.wire_page(),
                page_size: self.pagination.page_size,
            },
            filters: self.filters.committed().to_vec(),
            sort: Some(self.sorting.effective()),
            search,
        }
    }

    pub fn build_query(&self) -> Result<SelectQuery> {
        let (query, _) = self
            .fetch_request()
            .to_query(self.table(), &self.translator)?;
        Ok(query)
    }

    /// Start a fetch and return its generation
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        self.emit(TableEvent::FetchStarted {
            generation: self.generation,
        });
        self.generation
    }

    /// Apply a fetch result. Returns false when the result was stale.
    pub fn complete_fetch(&mut self, generation: u64, result: Result<RowPage>) -> bool {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                table = %self.config.id,
                "discarding stale fetch response"
            );
            self.emit(TableEvent::StaleResponseDiscarded {
                generation,
                current: self.generation,
            });
            return false;
        }

        match result {
            Ok(page) => {
                self.pagination.apply_totals(page.total_items);
                self.rows = page.rows;
                self.error = None;
                let rows = &self.rows;
                self.edits.retain(|edit| {
                    rows.get(edit.row_index).and_then(Row::id) == edit.original_data.id()
                });
                self.emit(TableEvent::FetchCompleted {
                    generation,
                    rows: self.rows.len(),
                    total_items: page.total_items,
                });
            }
            Err(e) => {
                tracing::error!(table = %self.config.id, error = %e, "table fetch failed");
                let message = e.user_message();
                self.rows.clear();
                self.pagination.apply_totals(0);
                self.error = Some(message.clone());
                self.emit(TableEvent::FetchFailed {
                    generation,
                    message,
                });
            }
        }
        self.status = LoadStatus::Ready;
        true
    }

    /// Fetch the current page. A failure is recorded on the table and returned.
    #[tracing::instrument(skip(self), fields(table = %self.config.id))]
    pub async fn refresh(&mut self) -> Result<()> {
        let generation = self.begin_fetch();
        let result = match self.build_query() {
            Ok(query) => self.store.select(&query).await,
            Err(e) => Err(e),
        };
        let failure = result.as_ref().err().map(|e| e.user_message());
        self.complete_fetch(generation, result);
        match failure {
            Some(message) => Err(TabulaError::Backend(message)),
            None => Ok(()),
        }
    }

    async fn refresh_after_mutation(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after mutation failed");
        }
    }

    // Query state

    fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit(TableEvent::SelectionCleared);
        }
    }

    /// Page, sort and filter changes invalidate the selection
    fn reset_page(&mut self) {
        self.pagination.reset();
        self.clear_selection();
    }

    pub async fn toggle_sort(&mut self, column: &str) -> Result<()> {
        let config = self
            .config
            .column(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        if !config.sortable {
            return Err(TableError::NotSortable(column.to_string()).into());
        }
        let key = config.accessor_key.clone();

        self.sorting.toggle(&key);
        self.emit(TableEvent::SortChanged {
            column: self.sorting.column.clone(),
            ascending: self
                .sorting
                .direction
                .map(|d| d == crate::state::SortDirection::Asc),
        });
        self.reset_page();
        self.refresh().await
    }

    pub fn add_filter(&mut self) -> usize {
        self.filters.add_filter()
    }

    pub fn update_filter(&mut self, index: usize, field: FilterField, value: Value) -> Result<()> {
        self.filters
            .update_filter(&self.config, index, field, value)
            .map_err(Into::into)
    }

    pub async fn apply_filters(&mut self) -> Result<Vec<DroppedFilter>> {
        let dropped = self.filters.apply_filters(&self.config);
        self.emit(TableEvent::FiltersApplied {
            committed: self.filters.committed().len(),
            dropped: dropped.len(),
        });
        self.reset_page();
        self.refresh().await?;
        Ok(dropped)
    }

    pub async fn remove_filter(&mut self, index: usize) -> Result<()> {
        self.filters.remove_filter(index)?;
        self.reset_page();
        self.refresh().await
    }

    pub async fn clear_filters(&mut self) -> Result<()> {
        self.filters.clear_all();
        self.reset_page();
        self.refresh().await
    }

    /// Replace filters and sorting, as when a saved filter is applied
    pub async fn apply_saved_filter(
        &mut self,
        filters: Vec<FilterValue>,
        sorting: SortingState,
    ) -> Result<()> {
        self.filters.replace(filters);
        self.sorting = sorting;
        self.reset_page();
        self.refresh().await
    }

    /// Set the search term immediately, without debouncing
    pub async fn set_search(&mut self, term: impl Into<String>) -> Result<()> {
        self.debouncer.cancel();
        if !self.search.set_term(term) {
            return Ok(());
        }
        self.emit(TableEvent::SearchChanged {
            term: self.search.term().to_string(),
        });
        self.reset_page();
        self.refresh().await
    }

    /// Record a keystroke and start its debounce
    pub fn begin_search(&mut self, input: impl Into<String>) -> DebounceTicket {
        self.search.set_input(input);
        self.debouncer.ticket()
    }

    /// Commit the typed search term if `ticket` is still the latest keystroke.
    /// Returns whether a fetch was issued.
    pub async fn commit_search(&mut self, ticket: &DebounceTicket) -> Result<bool> {
        if !ticket.is_current() || !self.search.commit() {
            return Ok(false);
        }
        self.emit(TableEvent::SearchChanged {
            term: self.search.term().to_string(),
        });
        self.reset_page();
        self.refresh().await?;
        Ok(true)
    }

    pub async fn set_page_index(&mut self, index: usize) -> Result<()> {
        self.pagination.set_page_index(index);
        self.page_changed().await
    }

    pub async fn next_page(&mut self) -> Result<()> {
        if !self.pagination.next() {
            return Ok(());
        }
        self.page_changed().await
    }

    pub async fn previous_page(&mut self) -> Result<()> {
        if !self.pagination.previous() {
            return Ok(());
        }
        self.page_changed().await
    }

    pub async fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        self.pagination.set_page_size(page_size);
        self.page_changed().await
    }

    async fn page_changed(&mut self) -> Result<()> {
        self.emit(TableEvent::PageChanged {
            page_index: self.pagination.page_index,
            page_size: self.pagination.page_size,
        });
        self.clear_selection();
        self.refresh().await
    }

    // Selection

    pub fn toggle_selection(&mut self, index: usize) -> Result<()> {
        if index >= self.rows.len() {
            return Err(TableError::RowIndex(index).into());
        }
        self.selection.toggle(index);
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(self.rows.len());
    }

    pub fn deselect_all(&mut self) {
        self.clear_selection();
    }

    // Mutations

    fn start_operation(&mut self, operation: &'static str) {
        self.operation_loading = true;
        self.emit(TableEvent::OperationStarted { operation });
    }

    fn finish_operation<T>(
        &mut self,
        operation: &'static str,
        result: &Result<T>,
        success: String,
        failure: Option<String>,
    ) {
        self.operation_loading = false;
        self.emit(TableEvent::OperationFinished {
            operation,
            ok: result.is_ok(),
        });
        match result {
            Ok(_) => self.notifier.notify(Notification::success(success)),
            Err(e) => {
                tracing::warn!(operation, table = %self.config.id, error = %e, "table operation failed");
                self.notifier
                    .notify(Notification::error(failure.unwrap_or_else(|| e.user_message())));
            }
        }
    }

    fn message(&self, pick: impl Fn(&crate::config::EditMessages) -> Option<&String>) -> Option<String> {
        self.config
            .edit
            .as_ref()
            .and_then(|e| e.messages.as_ref())
            .and_then(pick)
            .cloned()
    }

    fn row_id(&self, index: usize) -> Result<RowId> {
        let row = self.rows.get(index).ok_or(TableError::RowIndex(index))?;
        row.id().ok_or_else(|| TableError::MissingId.into())
    }

    #[tracing::instrument(skip(self, row), fields(table = %self.config.id))]
    pub async fn add_row(&mut self, row: Row) -> Result<Row> {
        if !self.config.allows_add() {
            return Err(TableError::EditingDisabled.into());
        }
        self.start_operation("add");
        let result = self.store.insert(self.config.table_name(), row).await;
        self.finish_operation("add", &result, "Record added successfully".into(), None);
        let row = result?;
        self.refresh_after_mutation().await;
        Ok(row)
    }

    #[tracing::instrument(skip(self, patch), fields(table = %self.config.id))]
    pub async fn update_row(&mut self, index: usize, patch: Row) -> Result<Row> {
        if !self.config.allows_update() {
            return Err(TableError::EditingDisabled.into());
        }
        let id = self.row_id(index)?;

        self.start_operation("update");
        let result = self.store.update(self.config.table_name(), &id, patch).await;
        let success = self
            .message(|m| m.success.as_ref().and_then(|s| s.update.as_ref()))
            .unwrap_or_else(|| "Record updated successfully".into());
        let failure = self.message(|m| m.error.as_ref().and_then(|s| s.update.as_ref()));
        self.finish_operation("update", &result, success, failure);

        let updated = result?;
        self.merge_rows(vec![(index, updated.clone())]);
        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(table = %self.config.id))]
    pub async fn delete_row(&mut self, index: usize) -> Result<()> {
        if !self.config.allows_delete() {
            return Err(TableError::EditingDisabled.into());
        }
        let id = self.row_id(index)?;

        self.start_operation("delete");
        let result = self
            .store
            .delete(self.config.table_name(), std::slice::from_ref(&id))
            .await
            .and_then(|deleted| match deleted {
                0 => Err(tabula_core::record_not_found(&id)),
                _ => Ok(()),
            });
        let success = self
            .message(|m| m.success.as_ref().and_then(|s| s.delete.as_ref()))
            .unwrap_or_else(|| "Record deleted successfully".into());
        let failure = self.message(|m| m.error.as_ref().and_then(|s| s.delete.as_ref()));
        self.finish_operation("delete", &result, success, failure);

        result?;
        self.edits.remove_row(index);
        self.clear_selection();
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Set one column to the same value on every selected row
    #[tracing::instrument(skip(self, value), fields(table = %self.config.id))]
    pub async fn bulk_edit(&mut self, column: &str, value: Value) -> Result<usize> {
        if self.selection.is_empty() {
            return Err(TableError::EmptySelection.into());
        }
        let column_config = self
            .config
            .column(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        let key = column_config.accessor_key.clone();
        let value = crate::state::validate_cell(column_config, value)?;
        if value.is_null() || value.as_str() == Some("") {
            return Err(TableError::invalid_field(key, "Please enter a value").into());
        }

        let mut patches = Vec::with_capacity(self.selection.len());
        for index in self.selection.indices() {
            let id = self.row_id(index)?;
            patches.push(
                Row::new()
                    .with("id", id.to_value())
                    .with(key.clone(), value.clone()),
            );
        }

        self.start_operation("bulk_edit");
        let result = self.store.upsert(self.config.table_name(), patches).await;
        let count = result.as_ref().map(Vec::len).unwrap_or_default();
        self.finish_operation(
            "bulk_edit",
            &result,
            format!("{} records updated successfully", count),
            None,
        );

        let updated = result?;
        let merged: Vec<(usize, Row)> = updated
            .into_iter()
            .filter_map(|row| {
                let id = row.id()?;
                let index = self.rows.iter().position(|r| r.id().as_ref() == Some(&id))?;
                Some((index, row))
            })
            .collect();
        self.merge_rows(merged);
        self.clear_selection();
        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(table = %self.config.id))]
    pub async fn bulk_delete(&mut self) -> Result<u64> {
        if self.selection.is_empty() {
            return Err(TableError::EmptySelection.into());
        }
        let ids = self
            .selection
            .indices()
            .map(|index| self.row_id(index))
            .collect::<Result<Vec<_>>>()?;

        self.start_operation("bulk_delete");
        let result = self.store.delete(self.config.table_name(), &ids).await;
        let count = result.as_ref().copied().unwrap_or_default();
        self.finish_operation(
            "bulk_delete",
            &result,
            format!("{} records deleted successfully", count),
            None,
        );

        let deleted = result?;
        self.clear_selection();
        self.edits.clear();
        self.refresh_after_mutation().await;
        Ok(deleted)
    }

    fn merge_rows(&mut self, updates: Vec<(usize, Row)>) {
        let mut indices = Vec::with_capacity(updates.len());
        for (index, row) in updates {
            if let Some(slot) = self.rows.get_mut(index) {
                *slot = row;
                indices.push(index);
            }
        }
        if !indices.is_empty() {
            self.emit(TableEvent::RowsMerged { indices });
        }
    }

    // Inline editing

    fn editable_column(&self, column: &str) -> Result<String> {
        if !self.config.allows_update() {
            return Err(TableError::EditingDisabled.into());
        }
        let config = self
            .config
            .column(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        if !config.editable {
            return Err(TableError::NotEditable(column.to_string()).into());
        }
        Ok(config.accessor_key.clone())
    }

    pub fn begin_edit(&mut self, row: usize, column: &str) -> Result<()> {
        let key = self.editable_column(column)?;
        if row >= self.rows.len() {
            return Err(TableError::RowIndex(row).into());
        }
        self.editing = Some((row, key));
        Ok(())
    }

    /// Queue the edited value for a cell. Returns false when it matches the
    /// original value and nothing is pending for the cell.
    pub fn commit_cell(&mut self, row: usize, column: &str, raw: Value) -> Result<bool> {
        let key = self.editable_column(column)?;
        let original = self.rows.get(row).ok_or(TableError::RowIndex(row))?;
        let config = self
            .config
            .column(&key)
            .ok_or_else(|| TableError::UnknownColumn(key.clone()))?;

        let queued = self.edits.upsert(row, config, raw, original)?;
        self.editing = None;
        if queued {
            self.emit(TableEvent::EditQueued { row, column: key });
        }
        Ok(queued)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn discard_pending_edits(&mut self) {
        self.editing = None;
        self.edits.clear();
    }

    /// Send every pending edit, one update per row, with bounded concurrency.
    ///
    /// Successes are merged and leave the pending set; failures stay pending.
    /// Nothing is rolled back. Exactly one notification is sent.
    #[tracing::instrument(skip(self), fields(table = %self.config.id, pending = self.edits.len()))]
    pub async fn save_pending_edits(&mut self) -> Result<BatchReport> {
        let patches = self.edits.patches_by_row();
        if patches.is_empty() {
            return Ok(BatchReport::default());
        }

        let jobs: Vec<(usize, Option<RowId>, Row)> = patches
            .into_iter()
            .map(|(index, patch)| (index, self.rows.get(index).and_then(Row::id), patch))
            .collect();

        self.start_operation("save_edits");
        let table = self.config.table_name().to_string();
        let store = Arc::clone(&self.store);

        let mut outcomes: Vec<(usize, BatchOutcome)> = futures::stream::iter(
            jobs.into_iter().enumerate(),
        )
        .map(|(position, (row_index, id, patch))| {
            let store = Arc::clone(&store);
            let table = table.clone();
            async move {
                let result = match &id {
                    Some(id) => store.update(&table, id, patch).await,
                    None => Err(TableError::MissingId.into()),
                };
                let outcome = BatchOutcome {
                    row_index,
                    id,
                    result: result.map_err(|e| e.user_message()),
                };
                (position, outcome)
            }
        })
        .buffer_unordered(self.commit_concurrency)
        .collect()
        .await;
        outcomes.sort_by_key(|(position, _)| *position);

        let report = BatchReport {
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        let merged: Vec<(usize, Row)> = report
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|row| (o.row_index, row.clone())))
            .collect();
        for (index, _) in &merged {
            self.edits.remove_row(*index);
        }
        self.merge_rows(merged);

        self.operation_loading = false;
        let (succeeded, failed) = (report.succeeded(), report.failed());
        self.emit(TableEvent::EditsCommitted { succeeded, failed });
        self.emit(TableEvent::OperationFinished {
            operation: "save_edits",
            ok: failed == 0,
        });

        if failed > 0 {
            let first = report
                .outcomes
                .iter()
                .find_map(|o| o.result.as_ref().err())
                .cloned()
                .unwrap_or_default();
            tracing::warn!(succeeded, failed, "some inline edits failed");
            self.notifier.notify(Notification::error(format!(
                "Failed to update {} of {} records: {}",
                failed,
                report.outcomes.len(),
                first
            )));
        } else {
            self.notifier.notify(Notification::success(format!(
                "{} records updated successfully",
                succeeded
            )));
        }

        Ok(report)
    }

    // Lookups

    /// Resolve every populate column. Columns whose lookup fails are left
    /// unresolved and logged.
    pub async fn load_lookups(&mut self) -> usize {
        let mut loaded = 0;
        let columns: Vec<_> = self
            .config
            .columns
            .iter()
            .filter_map(|c| c.populate.clone().map(|p| (c.accessor_key.clone(), p)))
            .collect();

        for (column, populate) in columns {
            match lookup::load_options(self.store.as_ref(), &populate).await {
                Ok(options) => {
                    self.lookups.insert(column, options);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(column = %column, lookup = %populate.table, error = %e, "lookup failed");
                }
            }
        }
        self.emit(TableEvent::LookupsLoaded { columns: loaded });
        loaded
    }

    /// Display text for one cell of the current page
    pub fn cell_text(&self, row: usize, column: &str) -> Option<String> {
        let config = self.config.column(column)?;
        let row = self.rows.get(row)?;
        Some(format_cell(
            row.get_path(&config.accessor_key),
            config,
            &self.lookups,
        ))
    }

    /// The current page in the query endpoint's shape
    pub fn page(&self) -> TablePage {
        let request = PageRequest {
            page: self.pagination.wire_page(),
            page_size: self.pagination.page_size,
        };
        TablePage::from_rows(
            RowPage {
                rows: self.rows.clone(),
                total_items: self.pagination.total_items,
            },
            &request,
        )
    }

    // Kanban

    fn kanban_config(&self) -> Result<&crate::config::KanbanConfig> {
        self.config
            .kanban
            .as_ref()
            .filter(|k| k.enabled)
            .ok_or_else(|| TableError::KanbanDisabled.into())
    }

    pub async fn set_view(&mut self, view: TableView) -> Result<()> {
        match view {
            TableView::Kanban => {
                self.load_kanban().await?;
            }
            TableView::Table => {
                self.kanban = None;
                self.refresh().await?;
            }
        }
        self.view = view;
        Ok(())
    }

    pub async fn load_kanban(&mut self) -> Result<&KanbanBoard> {
        let config = self.kanban_config()?.clone();
        let board = kanban::load_board(self.store.as_ref(), self.table(), &config).await?;
        Ok(self.kanban.insert(board))
    }

    /// Drop a card at `position` in `to_column`. A column change is written
    /// through a single-field update; the board only changes once it succeeds.
    #[tracing::instrument(skip(self), fields(table = %self.config.id))]
    pub async fn move_kanban_card(
        &mut self,
        card_id: &str,
        to_column: &str,
        position: usize,
    ) -> Result<()> {
        let config = self.kanban_config()?.clone();
        let mut board = match self.kanban.take() {
            Some(board) => board,
            None => kanban::load_board(self.store.as_ref(), self.table(), &config).await?,
        };
        let original = board.clone();

        let change = match board.move_card(card_id, to_column, position) {
            Ok(change) => change,
            Err(e) => {
                self.kanban = Some(original);
                return Err(e.into());
            }
        };
        let Some(change) = change else {
            self.kanban = Some(board);
            return Ok(());
        };

        self.start_operation("kanban_move");
        let result = kanban::persist_move(self.store.as_ref(), self.table(), &config, &change).await;
        self.finish_operation(
            "kanban_move",
            &result,
            format!("Moved to {}", to_column),
            None,
        );
        self.kanban = Some(if result.is_ok() { board } else { original });
        result.map(|_| ())
    }
}

/// Orchestrator shared between keystroke tasks
pub type SharedTable = Arc<tokio::sync::Mutex<TableOrchestrator>>;

/// Debounced search input: waits out the debounce without holding the table,
/// then fetches only if no later keystroke arrived. Returns whether it fetched.
pub async fn search_input(table: &SharedTable, input: impl Into<String>) -> Result<bool> {
    let ticket = table.lock().await.begin_search(input);
    if !ticket.settled().await {
        return Ok(false);
    }
    table.lock().await.commit_search(&ticket).await
}
