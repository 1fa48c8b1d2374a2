//! Authentication Handlers Module
//!
//! This module contains all HTTP handlers for authentication endpoints.
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs      - Module exports and documentation
//! ├── types.rs    - Request and response types
//! ├── signup.rs   - Admin bootstrap, staff accounts, parent signup
//! ├── login.rs    - User authentication handler
//! ├── password.rs - Password reset by emailed code
//! └── me.rs       - Get current user handler
//! ```
//!
//! # Handlers
//!
//! - **`signup`** - POST /api/auth/signup - First administrator
//! - **`create_staff`** - POST /api/auth/staff - Staff account (admin)
//! - **`parent_signup`** - POST /api/auth/parent-signup - Parent account
//! - **`login`** - POST /api/auth/login - User authentication
//! - **`forgot_password`** / **`reset_password`** - POST /api/auth/password/{forgot,reset}
//! - **`get_me`** - GET /api/auth/me - Get current user info

/// Request and response types
pub mod types;

/// Account creation handlers
pub mod signup;

/// Login handler
pub mod login;

/// Password reset handlers
pub mod password;

/// Get current user handler
pub mod me;

// Re-export commonly used types
pub use types::{AuthResponse, LoginRequest, SignupRequest, UserResponse};

// Re-export handlers
pub use login::login;
pub use me::get_me;
pub use password::{forgot_password, reset_password};
pub use signup::{create_staff, parent_signup, signup};
