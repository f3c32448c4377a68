//! Row store backends for Tabula
//!
//! - [`MemoryStore`] - process-local tables, used for tests and demos
//! - [`SqliteStore`] - row store on SQLite, one JSON document per row
//! - [`MongoStore`] - document store on MongoDB
//!
//! [`open_store`] builds the backend named by a [`StoreConfig`].

mod memory;
mod mongo;
mod open;
mod sqlite;

pub use memory::*;
pub use mongo::*;
pub use open::*;
pub use sqlite::*;
