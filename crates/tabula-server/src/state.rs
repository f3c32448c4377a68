//! Shared handler state

use std::collections::HashMap;
use std::sync::Arc;

use tabula_core::RowStore;
use tabula_interchange::Exporter;
use tabula_pages::{PageRenderer, PageRepository};
use tabula_table::{SavedFilterRepository, TableConfig};

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Settings the handlers read on every request
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub allowed_origins: String,
    pub external_api_secret: Option<String>,
    pub commit_concurrency: usize,
    pub default_page_size: usize,
}

impl From<&ServerConfig> for Settings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            external_api_secret: config.external_api_secret.clone(),
            commit_concurrency: config.commit_concurrency,
            default_page_size: config.default_page_size,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RowStore>,
    tables: Arc<HashMap<String, Arc<TableConfig>>>,
    pub pages: PageRepository,
    pub renderer: Arc<PageRenderer>,
    pub saved_filters: SavedFilterRepository,
    pub exporter: Exporter,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn RowStore>, settings: Settings) -> Self {
        Self {
            pages: PageRepository::new(store.clone()),
            renderer: Arc::new(PageRenderer::new(store.clone())),
            saved_filters: SavedFilterRepository::new(store.clone()),
            exporter: Exporter::new(),
            tables: Arc::new(HashMap::new()),
            settings: Arc::new(settings),
            store,
        }
    }

    /// Register table configurations, keyed by their `id`
    pub fn with_tables(mut self, tables: impl IntoIterator<Item = TableConfig>) -> Self {
        let mut map = HashMap::new();
        for table in tables {
            tracing::debug!(table = %table.id, endpoint = %table.table_name(), "registered table");
            map.insert(table.id.clone(), Arc::new(table));
        }
        self.tables = Arc::new(map);
        self
    }

    pub fn table(&self, name: &str) -> Result<Arc<TableConfig>, ApiError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Table {} not found", name)))
    }

    pub fn table_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
