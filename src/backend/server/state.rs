/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct serves as the central state container for the
 * application, holding:
 * - The SQLite connection pool
 * - Configuration (JWT secret, gateway secret, TTLs)
 * - Notification clients (SMS, email)
 * - The ephemeral store for USSD sessions and reset codes
 *
 * Every field is cheap to clone (`Arc` or pooled handles).
 *
 * # Example
 *
 * ```rust,ignore
 * use feedesk::backend::server::state::AppState;
 * use axum::extract::State;
 *
 * async fn handler(State(state): State<AppState>) {
 *     let school = &state.config.school_name;
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::backend::notifications::email::Mailer;
use crate::backend::notifications::sms::SmsClient;
use crate::backend::notifications::store::EphemeralStore;
use crate::shared::AppConfig;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db_pool: SqlitePool,

    /// Validated configuration
    pub config: Arc<AppConfig>,

    /// SMS gateway client
    pub sms: SmsClient,

    /// SMTP mailer
    pub mailer: Mailer,

    /// TTL-bounded key-value store
    pub store: EphemeralStore,
}

impl AppState {
    /// Build the state from a configuration and an open pool
    pub fn new(config: AppConfig, db_pool: SqlitePool) -> Result<Self, crate::backend::error::BackendError> {
        let mailer = Mailer::new(config.smtp.as_ref())?;
        Ok(Self {
            sms: SmsClient::new(config.sms.clone()),
            mailer,
            store: EphemeralStore::new(db_pool.clone()),
            config: Arc::new(config),
            db_pool,
        })
    }
}

/// Implement FromRef for SqlitePool
///
/// Handlers that only need the database can extract `State<SqlitePool>`.
impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SmsClient {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sms.clone()
    }
}

impl FromRef<AppState> for EphemeralStore {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}
