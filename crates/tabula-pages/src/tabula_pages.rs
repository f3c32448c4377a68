//! Tabula Pages
//!
//! Stored pages are an ordered tree of typed content nodes. Containers lay
//! their children out on a 12-unit grid; table nodes embed a live data table.
//!
//! - [`Page`] / [`PageRepository`] - persistence in the `pages` table
//! - [`ContainerLayout`] - column classes and child bucketing
//! - [`PageRenderer`] - turns a page into HTML blocks

mod layout;
mod page;
mod renderer;
mod repository;
mod templates;

pub use layout::*;
pub use page::*;
pub use renderer::*;
pub use repository::*;
