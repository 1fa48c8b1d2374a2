//! Middleware Module
//!
//! This module contains all HTTP middleware for the backend server.
//!
//! - **`auth`** - Bearer-token authentication and role extractors
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::middleware;
//! use feedesk::backend::middleware::auth_middleware;
//!
//! let protected = router.route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
//! ```

pub mod auth;

pub use auth::{auth_middleware, extract_authenticated_user, AdminUser, AuthUser, AuthenticatedUser, StaffUser};
