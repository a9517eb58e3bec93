mod config;
mod db;
mod errors;
mod matching;
mod models;
mod routes;
mod state;
mod store;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::matching::repository::MatchingRepository;
use crate::routes::{build_router, middleware};
use crate::state::AppState;
use crate::store::{MatchingStore, MemoryStore, MongoStore};

/// `DB_DRIVER` value that selects the in-process store instead of MongoDB.
const MEMORY_DRIVER: &str = "memory";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_PKG_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matching API v{}", env!("CARGO_PKG_VERSION"));

    let (store, client) = if config.db_driver == MEMORY_DRIVER {
        warn!("DB_DRIVER={MEMORY_DRIVER}: matchings are kept in process and lost on exit");
        (Arc::new(MemoryStore::new()) as Arc<dyn MatchingStore>, None)
    } else {
        let client = db::connect(&config).await?;
        let store = MongoStore::new(&client, &config.db_name);
        (Arc::new(store) as Arc<dyn MatchingStore>, Some(client))
    };
    let repo = MatchingRepository::new(store, config.store_timeout);

    let state = AppState {
        repo,
        config: config.clone(),
    };

    let app = middleware::apply(build_router(state), &config);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!("Matching API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(client) = client {
        info!("Database stopping: {}", config.db_host);
        if tokio::time::timeout(config.shutdown_timeout, async { client.shutdown().await })
            .await
            .is_err()
        {
            warn!(
                "MongoDB client did not shut down within {:?}",
                config.shutdown_timeout
            );
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
