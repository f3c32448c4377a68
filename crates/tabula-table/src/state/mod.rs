//! Filter, sort, search, pagination, edit and selection state
//!
//! Pure in-memory state with no backend knowledge; the orchestrator turns it
//! into queries.

mod edits;
mod filters;
mod pagination;
mod search;
mod selection;
mod sorting;

pub use edits::*;
pub use filters::*;
pub use pagination::*;
pub use search::*;
pub use selection::*;
pub use sorting::*;
