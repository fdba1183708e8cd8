//! # dotrack-api: Binary Entry Point
//!
//! Reads configuration from the environment, selects the store (PostgreSQL
//! when `DATABASE_URL` is set, process memory otherwise) and serves the API.

use std::sync::Arc;

use anyhow::Context;
use dotrack_api::state::{AppConfig, AppState, LogFormat};
use dotrack_workflow::{init_pool, MemoryStore, PgStore, WorkflowEngine, WorkflowStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(?config, "configuration loaded");

    let store: Arc<dyn WorkflowStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = init_pool(url, config.database_max_connections)
                .await
                .context("database initialization failed")?;
            tracing::info!("using PostgreSQL store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; orders are kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let port = config.port;
    let state = AppState::with_engine(config, WorkflowEngine::new(store));
    let app = dotrack_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("dotrack API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
