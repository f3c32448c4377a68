//! Server configuration
//!
//! Layered, lowest to highest precedence:
//!
//! 1. built-in defaults
//! 2. the TOML file named by `--config`
//! 3. environment variables
//! 4. command-line flags
//!
//! Layers 3 and 4 both arrive through [`Cli`], since clap reads each flag's
//! environment variable when the flag itself is absent.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tabula_core::{Result, TabulaError};
use tabula_store::StoreConfig;

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Sqlite,
    Mongodb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Value of `Access-Control-Allow-Origin` on every response
    pub allowed_origins: String,
    /// Shared secret for `/api/external/*`; unset rejects every external call
    pub external_api_secret: Option<String>,
    pub backend: BackendKind,
    pub sqlite_path: Option<PathBuf>,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: Option<String>,
    /// Directory of `*.json` table configurations
    pub tables_dir: Option<PathBuf>,
    pub commit_concurrency: usize,
    pub default_page_size: usize,
    pub log_dir: Option<PathBuf>,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            allowed_origins: String::new(),
            external_api_secret: None,
            backend: BackendKind::Memory,
            sqlite_path: None,
            mongodb_uri: None,
            mongodb_database: None,
            tables_dir: None,
            commit_concurrency: tabula_table::DEFAULT_COMMIT_CONCURRENCY,
            default_page_size: 10,
            log_dir: None,
            json_logs: false,
        }
    }
}

/// Command-line flags; each falls back to its environment variable
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "tabula-server", version, about = "Serve Tabula tables and pages over HTTP")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c', env = "TABULA_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "TABULA_BIND")]
    pub bind: Option<String>,

    #[arg(long, env = "ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,

    #[arg(long, env = "EXTERNAL_API_SECRET", hide_env_values = true)]
    pub external_api_secret: Option<String>,

    #[arg(long, value_enum, env = "TABULA_BACKEND")]
    pub backend: Option<BackendKind>,

    #[arg(long, env = "TABULA_SQLITE_PATH")]
    pub sqlite_path: Option<PathBuf>,

    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    #[arg(long, env = "MONGODB_DATABASE")]
    pub mongodb_database: Option<String>,

    #[arg(long, env = "TABULA_TABLES_DIR")]
    pub tables_dir: Option<PathBuf>,

    #[arg(long, env = "TABULA_COMMIT_CONCURRENCY")]
    pub commit_concurrency: Option<usize>,

    #[arg(long, env = "TABULA_DEFAULT_PAGE_SIZE")]
    pub default_page_size: Option<usize>,

    #[arg(long, env = "TABULA_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Also write JSON logs to a daily rotated file
    #[arg(long, env = "TABULA_JSON_LOGS")]
    pub json_logs: Option<bool>,
}

impl ServerConfig {
    /// Resolve the full configuration for `cli`
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TabulaError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TabulaError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = &cli.bind {
            self.bind = bind.clone();
        }
        if let Some(origins) = &cli.allowed_origins {
            self.allowed_origins = origins.clone();
        }
        if let Some(secret) = &cli.external_api_secret {
            self.external_api_secret = Some(secret.clone());
        }
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(path) = &cli.sqlite_path {
            self.sqlite_path = Some(path.clone());
        }
        if let Some(uri) = &cli.mongodb_uri {
            self.mongodb_uri = Some(uri.clone());
        }
        if let Some(database) = &cli.mongodb_database {
            self.mongodb_database = Some(database.clone());
        }
        if let Some(dir) = &cli.tables_dir {
            self.tables_dir = Some(dir.clone());
        }
        if let Some(limit) = cli.commit_concurrency {
            self.commit_concurrency = limit;
        }
        if let Some(size) = cli.default_page_size {
            self.default_page_size = size;
        }
        if let Some(dir) = &cli.log_dir {
            self.log_dir = Some(dir.clone());
        }
        if let Some(json) = cli.json_logs {
            self.json_logs = json;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind.trim().is_empty() {
            return Err(TabulaError::Configuration("bind address cannot be empty".into()));
        }
        if self.commit_concurrency == 0 {
            return Err(TabulaError::Configuration("commit_concurrency cannot be 0".into()));
        }
        if self.default_page_size == 0 {
            return Err(TabulaError::Configuration("default_page_size cannot be 0".into()));
        }
        self.store_config().map(|_| ())
    }

    /// Backend selection as the store crate expects it
    pub fn store_config(&self) -> Result<StoreConfig> {
        match self.backend {
            BackendKind::Memory => Ok(StoreConfig::Memory),
            BackendKind::Sqlite => {
                let path = self.sqlite_path.clone().ok_or_else(|| {
                    TabulaError::Configuration("sqlite backend requires sqlite_path".into())
                })?;
                Ok(StoreConfig::Sqlite { path })
            }
            BackendKind::Mongodb => {
                let uri = self.mongodb_uri.clone().ok_or_else(|| {
                    TabulaError::Configuration("mongodb backend requires mongodb_uri".into())
                })?;
                let database = self.mongodb_database.clone().ok_or_else(|| {
                    TabulaError::Configuration("mongodb backend requires mongodb_database".into())
                })?;
                Ok(StoreConfig::Mongodb { uri, database })
            }
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        let mut logging = if cfg!(debug_assertions) {
            LoggingConfig::development()
        } else {
            LoggingConfig::production()
        };
        if let Some(dir) = &self.log_dir {
            logging.log_dir = dir.clone();
        }
        logging.enable_json_logs = self.json_logs;
        logging
    }
}
