use std::sync::Arc;

use pickup_service::api;
use pickup_service::clock::SystemClock;
use pickup_service::config::Config;
use pickup_service::engine::query::QuerySettings;
use pickup_service::error::AppError;
use pickup_service::repository::InMemoryStore;
use pickup_service::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let store = match &config.seed_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|err| AppError::Internal(format!("failed to read seed {path}: {err}")))?;
            let store = InMemoryStore::from_json(&raw)
                .map_err(|err| AppError::Internal(format!("invalid seed {path}: {err}")))?;
            tracing::info!(seed = %path, pickups = store.pickup_count(), "seed loaded");
            store
        }
        None => InMemoryStore::new(),
    };

    let query_settings = QuerySettings {
        strict_search: config.strict_search,
        utc_offset: config.report_offset()?,
    };
    let shared_state = Arc::new(AppState::in_memory(
        Arc::new(store),
        Arc::new(SystemClock),
        query_settings,
    ));

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
