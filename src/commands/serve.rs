//! Serve command - Starts the HTTP server.

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::{Config, StorageBackend};
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, Database, HealthCheck, Persistence};
use crate::services::Services;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!(backend = ?config.storage_backend, "Starting server...");

    let app_state = match config.storage_backend {
        StorageBackend::Relational => relational_state(config).await?,
        StorageBackend::Document => {
            tracing::warn!("Document backend keeps all data in memory; it is lost on exit");
            AppState::in_memory(config)
        }
    };

    let app = create_router(app_state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// PostgreSQL for records, Redis for pending confirmations.
async fn relational_state(config: Config) -> AppResult<AppState> {
    let database = Arc::new(Database::connect(&config).await?);
    tracing::info!("Database connected");

    let cache = Arc::new(Cache::connect(&config).await?);
    tracing::info!("Redis cache connected");

    let uow = Arc::new(Persistence::new(database.get_connection()));
    let services = Services::from_uow(uow, cache.clone(), config);

    let probes: Vec<Arc<dyn HealthCheck>> = vec![database as Arc<dyn HealthCheck>, cache];
    Ok(AppState::from_container(&services, probes))
}
