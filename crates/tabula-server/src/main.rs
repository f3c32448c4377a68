use anyhow::{Context, Result};
use clap::Parser;
use tabula_server::{AppState, Cli, ServerConfig, Settings, logging, router};
use tabula_table::TableConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(&cli).context("failed to load configuration")?;
    let _log_guard = logging::init(config.logging())?;

    let store = tabula_store::open_store(&config.store_config()?)
        .await
        .context("failed to open row store")?;
    tracing::info!(backend = store.backend_name(), "row store ready");

    let tables = match &config.tables_dir {
        Some(dir) => TableConfig::load_dir(dir)
            .with_context(|| format!("failed to load tables from {}", dir.display()))?,
        None => Vec::new(),
    };
    tracing::info!(count = tables.len(), "table configurations loaded");

    let state = AppState::new(store, Settings::from(&config)).with_tables(tables);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "tabula server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("tabula server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
