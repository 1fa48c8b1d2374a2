//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//! Routes are organized by access level into focused submodules.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs            - Module exports and documentation
//! ├── router.rs         - Main router creation
//! ├── public_routes.rs  - Unauthenticated routes
//! └── api_routes.rs     - Authenticated API endpoints
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use feedesk::backend::routes::create_router;
//! use feedesk::backend::server::state::AppState;
//!
//! let router = create_router(AppState::new(config, pool)?);
//! ```

/// Main router creation
pub mod router;

/// Unauthenticated routes
pub mod public_routes;

/// Authenticated API endpoint handlers
pub mod api_routes;

pub use router::create_router;
