//! Backend Error Module
//!
//! This module defines the error type used by handlers and services. Errors
//! convert to JSON HTTP responses with an appropriate status code.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse implementation
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::{is_unique_violation, BackendError};

/// Result alias used across the backend
pub type BackendResult<T> = Result<T, BackendError>;
