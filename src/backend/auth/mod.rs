//! Authentication Module
//!
//! This module handles accounts, login, password reset and JWT tokens for
//! the three roles: administrators, bursary staff and parents.
//!
//! # Architecture
//!
//! - **`users`** - User data model and database operations
//! - **`sessions`** - JWT token generation and validation
//! - **`otp`** - One-time codes for password reset
//! - **`handlers`** - HTTP handlers for authentication endpoints
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! ├── users.rs        - User model and database operations
//! ├── sessions.rs     - JWT token management
//! ├── otp.rs          - Reset codes in the ephemeral store
//! └── handlers/       - HTTP handlers
//! ```
//!
//! # Authentication Flow
//!
//! 1. **Signup**: the first administrator registers; later accounts are created by admins
//! 2. **Parent signup**: a parent registers with the phone or email on a student record
//! 3. **Login**: email and password verified, JWT token returned
//! 4. **Requests**: `auth_middleware` verifies the token and loads the current role
//!
//! # Security
//!
//! - Passwords are hashed using bcrypt before storage
//! - Tokens expire after 30 days
//! - Invalid credentials return 401 (no information leakage)

/// User data model and database operations
pub mod users;

/// JWT token generation and validation
pub mod sessions;

/// Password reset codes
pub mod otp;

/// HTTP handlers for authentication endpoints
pub mod handlers;

// Re-export commonly used types and handlers
pub use handlers::types::{AuthResponse, LoginRequest, SignupRequest, UserResponse};
pub use handlers::{create_staff, forgot_password, get_me, login, parent_signup, reset_password, signup};
