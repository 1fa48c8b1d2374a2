//! Backend Module
//!
//! This module contains all server-side code for feedesk: an Axum HTTP
//! server over SQLite that keeps student fee accounts.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`db`** - Connection pool, schema and reference data seeding
//! - **`auth`** - Accounts, JWT tokens, password reset
//! - **`middleware`** - Bearer-token authentication and role extractors
//! - **`students`** - Student records and balances
//! - **`fees`** - Fee structures, deadlines and the fee calculator
//! - **`payments`** - Payment recording and PDF receipts
//! - **`webhooks`** - Gateway webhooks and the pending payment queue
//! - **`reports`** - Dashboard, collection reports and CSV exports
//! - **`parents`** - Parent portal
//! - **`notifications`** - SMS, email, USSD and the ephemeral store
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Initialization, state and configuration
//! ├── routes/         - Route configuration
//! ├── db/             - Pool, schema and seeding
//! ├── auth/           - Authentication
//! ├── middleware/     - Request middleware
//! ├── students/       - Student records
//! ├── fees/           - Fee structures and calculator
//! ├── payments/       - Payment recorder and receipts
//! ├── webhooks/       - Gateway reconciliation
//! ├── reports/        - Reporting and exports
//! ├── parents/        - Parent portal
//! ├── notifications/  - SMS, email, USSD
//! └── error/          - Error types
//! ```
//!
//! # Money and Consistency
//!
//! A payment insert and the matching balance update always commit in one
//! transaction. Balances are adjusted with relative SQL updates, so
//! concurrent payments for the same student never lose an update.

pub mod auth;
pub mod db;
pub mod error;
pub mod fees;
pub mod middleware;
pub mod notifications;
pub mod parents;
pub mod payments;
pub mod reports;
pub mod routes;
pub mod server;
pub mod students;
pub mod webhooks;

pub use error::{BackendError, BackendResult};
pub use server::{create_app, AppState};
