//! Feedesk - School Fee Management Backend
//!
//! Feedesk keeps student fee accounts for a school: fee structures per grade,
//! payment recording with atomic balance updates, payment-gateway webhook
//! reconciliation, receipts, reports and SMS/USSD/email notifications.
//!
//! # Module Structure
//!
//! - **`shared`** - Domain types (students, fees, payments) and validation
//!   - No database or network access
//!   - Usable by API clients
//!
//! - **`backend`** - Axum HTTP server (only compiled with `ssr` feature)
//!   - SQLite persistence through sqlx
//!   - JWT authentication and role checks
//!   - Fee calculator, payment recorder, webhook reconciler
//!   - Reports, exports and notifications
//!
//! # Feature Flags
//!
//! - **`ssr`** - Server-side code (enabled by default)
//!
//! # Usage
//!
//! ```rust,no_run
//! use feedesk::backend::server::init::create_app;
//! use feedesk::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::builder().jwt_secret("change-me").build()?;
//! let app = create_app(config).await?;
//! // Serve `app` with axum::serve
//! # Ok(())
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
