//! FOLIO API Server Entry Point
//!
//! Reads configuration from the environment, opens the configured store
//! and serves the Axum router until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use folio_api::telemetry::init_tracing;
use folio_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, DbConfig, PgStore,
    ServerConfig, StoreBackend,
};
use folio_storage::{InMemoryStore, WikiStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let server_config = ServerConfig::from_env()?;
    init_tracing(server_config.log_format)?;

    let store: Arc<dyn WikiStore> = match server_config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Postgres => {
            let db_config = DbConfig::from_env();
            let store = PgStore::from_config(&db_config)?;
            store.ensure_schema().await?;
            tracing::info!(pool_size = store.pool_size(), "Connected to PostgreSQL");
            Arc::new(store)
        }
    };

    let state = AppState::new(store, AuthConfig::from_env(), ApiConfig::from_env());
    let app: Router = create_api_router(state)?;

    let addr = server_config.bind_addr()?;
    tracing::info!(
        %addr,
        environment = %server_config.environment,
        store = ?server_config.store,
        "Starting FOLIO API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
