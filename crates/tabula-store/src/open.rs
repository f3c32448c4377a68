use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tabula_core::{Result, RowStore};

use crate::{MemoryStore, MongoStore, SqliteStore};

/// Which backend to open
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite { path: PathBuf },
    Mongodb { uri: String, database: String },
}

/// Open the configured backend
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RowStore>> {
    let store: Arc<dyn RowStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
        StoreConfig::Mongodb { uri, database } => {
            Arc::new(MongoStore::connect(uri, database).await?)
        }
    };
    tracing::info!(backend = store.backend_name(), "row store opened");
    Ok(store)
}
