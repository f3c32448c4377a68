//! Tabula Table - configuration-driven data tables
//!
//! - [`TableConfig`] - static per-table declaration loaded from JSON
//! - [`state`] - filter, sort, search, pagination, edit and selection state
//! - [`TableOrchestrator`] - turns state changes into fetches and runs mutations
//! - [`KanbanBoard`] - card view grouped by a status column
//! - [`SavedFilterRepository`] - named filter presets

mod config;
mod debounce;
mod error;
mod events;
mod format;
mod kanban;
mod lookup;
mod orchestrator;
mod protocol;
mod saved_filters;
pub mod state;

pub use config::*;
pub use debounce::*;
pub use error::*;
pub use events::*;
pub use format::*;
pub use kanban::*;
pub use lookup::*;
pub use orchestrator::*;
pub use protocol::*;
pub use saved_filters::*;
pub use state::*;
