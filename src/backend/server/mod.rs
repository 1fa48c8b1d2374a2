//! Server Module
//!
//! - **`config`** - Environment configuration and database start-up
//! - **`state`** - Shared application state
//! - **`init`** - Application assembly

pub mod config;
pub mod init;
pub mod state;

pub use init::{create_app, create_app_with_pool};
pub use state::AppState;
