//! Tabula Query - from table filter state to backend predicates
//!
//! - [`FilterOperator`] / [`ColumnType`] - the operator vocabulary and which
//!   operators each column type offers
//! - [`FilterValue`] - one filter row as the table UI holds it
//! - [`PredicateTranslator`] - maps filter rows onto [`tabula_core::Predicate`]
//! - [`sql`], [`mongo`], [`eval`] - render or evaluate predicates for the
//!   SQLite, MongoDB and in-memory backends

mod error;
pub mod eval;
mod filter;
pub mod mongo;
mod operator;
pub mod sql;
mod translate;

pub use error::*;
pub use filter::*;
pub use operator::*;
pub use translate::*;
