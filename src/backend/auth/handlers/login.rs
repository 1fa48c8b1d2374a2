/**
 * Login Handler
 *
 * This module implements the user authentication handler for POST /api/auth/login.
 *
 * # Authentication Process
 *
 * 1. Look up user by email
 * 2. Verify password using bcrypt
 * 3. Generate JWT token
 * 4. Return token and user info
 *
 * # Security
 *
 * - Unknown emails and wrong passwords both return 401 (no user enumeration)
 * - JWT tokens are generated with 30-day expiration
 */

use axum::{extract::State, response::Json};

use crate::backend::auth::handlers::signup::issue_token;
use crate::backend::auth::handlers::types::{AuthResponse, LoginRequest};
use crate::backend::auth::users::{get_user_by_email, verify_password};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::server::state::AppState;

/// Login handler
///
/// # Errors
///
/// * `401 Unauthorized` - If user is not found or password is incorrect
/// * `500 Internal Server Error` - If database query or token generation fails
///
/// # Example Request
///
/// ```http
/// POST /api/auth/login HTTP/1.1
/// Content-Type: application/json
///
/// {
///   "email": "bursar@school.ac.ke",
///   "password": "securepassword123"
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> BackendResult<Json<AuthResponse>> {
    tracing::info!("Login request for: {}", request.email);

    let user = get_user_by_email(&state.db_pool, &request.email)
        .await?
        .ok_or_else(|| {
            tracing::warn!("User not found: {}", request.email);
            BackendError::Unauthorized
        })?;

    if !verify_password(request.password, user.password_hash.clone()).await? {
        tracing::warn!("Invalid password for user: {}", request.email);
        return Err(BackendError::Unauthorized);
    }

    let token = issue_token(&state, &user)?;
    tracing::info!("User logged in: {} ({})", user.email, user.role.as_str());

    Ok(Json(AuthResponse { token, user: user.into() }))
}
