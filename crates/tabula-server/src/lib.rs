//! Tabula HTTP server
//!
//! Serves the page API, the secret-guarded external page API, the generic
//! table endpoints and server-rendered pages over one axum router.

pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{BackendKind, Cli, ServerConfig};
pub use error::ApiError;
pub use logging::LoggingConfig;
pub use routes::router;
pub use state::{AppState, Settings};
