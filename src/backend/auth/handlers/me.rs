/**
 * Get Current User Handler
 *
 * GET /api/auth/me returns the account behind the bearer token. The token is
 * checked by `auth_middleware`; this handler only loads the user.
 */

use axum::{extract::State, response::Json};
use sqlx::SqlitePool;

use crate::backend::auth::handlers::types::UserResponse;
use crate::backend::auth::users::get_user_by_id;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::AuthUser;

/// Get current user handler
///
/// # Errors
///
/// * `401 Unauthorized` - missing or invalid token (from the middleware)
/// * `404 Not Found` - the account was deleted after the token was issued
pub async fn get_me(
    State(pool): State<SqlitePool>,
    AuthUser(auth): AuthUser,
) -> BackendResult<Json<UserResponse>> {
    let user = get_user_by_id(&pool, auth.user_id).await?.ok_or_else(|| {
        tracing::warn!("User not found: {}", auth.user_id);
        BackendError::not_found("User not found")
    })?;

    Ok(Json(user.into()))
}
