//! Common test utilities and helpers
//!
//! - Database fixtures (in-memory and file-backed pools, seed data)
//! - Authentication helpers (accounts and bearer tokens)
//! - A ready-to-use `TestApp` wrapping the full router

#![allow(dead_code)]

pub mod auth_helpers;
pub mod database;

pub use auth_helpers::*;
pub use database::*;

use axum_test::TestServer;
use feedesk::backend::server::init::create_app_with_pool;
use feedesk::shared::AppConfig;
use sqlx::SqlitePool;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_GATEWAY_SECRET: &str = "sk_test_gateway";

/// Configuration used by every integration test
pub fn test_config() -> AppConfig {
    AppConfig::builder()
        .jwt_secret(TEST_JWT_SECRET)
        .gateway_secret(TEST_GATEWAY_SECRET)
        .school_name("Test Academy")
        .build()
        .expect("valid test configuration")
}

/// Full application over an in-memory database
pub struct TestApp {
    pub server: TestServer,
    pub pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let pool = create_test_pool().await;
        let app = create_app_with_pool(config, pool.clone()).expect("Failed to build app");
        let server = TestServer::new(app).expect("Failed to start test server");
        Self { server, pool }
    }
}
