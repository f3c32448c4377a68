//! Table events and user notifications
//!
//! The orchestrator reports state changes as [`TableEvent`]s to an optional
//! listener, and user-facing outcomes (toasts) through a [`NotificationSink`].

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// State changes emitted by the table orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    FetchStarted { generation: u64 },
    FetchCompleted { generation: u64, rows: usize, total_items: u64 },
    FetchFailed { generation: u64, message: String },
    /// A response arrived after a newer fetch had started
    StaleResponseDiscarded { generation: u64, current: u64 },
    RowsMerged { indices: Vec<usize> },
    SelectionCleared,
    FiltersApplied { committed: usize, dropped: usize },
    SortChanged { column: Option<String>, ascending: Option<bool> },
    SearchChanged { term: String },
    PageChanged { page_index: usize, page_size: usize },
    EditQueued { row: usize, column: String },
    EditsCommitted { succeeded: usize, failed: usize },
    OperationStarted { operation: &'static str },
    OperationFinished { operation: &'static str, ok: bool },
    LookupsLoaded { columns: usize },
}

/// Receives every [`TableEvent`]
pub trait TableEventListener: Send + Sync {
    fn on_event(&self, event: &TableEvent);
}

/// Listener that keeps events in memory
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<TableEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TableEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TableEventListener for EventLog {
    fn on_event(&self, event: &TableEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

/// A transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => tracing::warn!(message = %notification.message, "table notification"),
            _ => tracing::info!(message = %notification.message, "table notification"),
        }
    }
}

/// Keeps notifications so callers (HTTP handlers, tests) can read them back
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.level == NotificationLevel::Error)
            .cloned()
            .collect()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock())
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}
