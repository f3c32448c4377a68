//! Tabula Core - shared abstractions for the table and page services
//!
//! This crate provides the types every other Tabula crate depends on:
//!
//! - `RowStore` - Trait for row/document backends
//! - `Predicate` - Backend-neutral comparison produced by the translator
//! - `SelectQuery` / `RowPage` - One paginated read and its result
//! - `Row` / `RowId` - Opaque records keyed by a backend-assigned id

mod error;
mod predicate;
mod store;
mod types;

pub use error::*;
pub use predicate::*;
pub use store::*;
pub use types::*;

pub use serde_json::{Map, Value};
