/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including state creation, database loading, and route configuration.
 *
 * # Initialization Process
 *
 * 1. Open the SQLite pool and apply the schema
 * 2. Seed reference data when a reference file is configured
 * 3. Build notification clients and the ephemeral store
 * 4. Create the router
 * 5. Start the periodic purge of expired USSD sessions and reset codes
 */

use std::time::Duration;

use axum::Router;
use sqlx::SqlitePool;

use crate::backend::error::BackendError;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;

const PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Create and configure the Axum application
///
/// # Errors
///
/// Fails when the database cannot be opened or a notification client
/// cannot be built from the configuration.
pub async fn create_app(config: AppConfig) -> Result<Router<()>, BackendError> {
    tracing::info!("Initializing feedesk backend server");

    let db_pool = load_database(&config).await?;
    create_app_with_pool(config, db_pool)
}

/// Create the application around an already open pool
///
/// Must be called from within a Tokio runtime: it spawns the purge task.
pub fn create_app_with_pool(config: AppConfig, db_pool: SqlitePool) -> Result<Router<()>, BackendError> {
    let app_state = AppState::new(config, db_pool)?;
    let app = create_router(app_state.clone());

    let store = app_state.store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!("Purged {} expired ephemeral entries", removed),
                Err(e) => tracing::warn!("Failed to purge ephemeral store: {:?}", e),
            }
        }
    });

    tracing::info!("Router configured with periodic purge task");
    Ok(app)
}
