/**
 * Authentication Middleware
 *
 * This module provides middleware for protecting routes that require
 * user authentication. It extracts and verifies JWT tokens from the
 * Authorization header, loads the account, and exposes it to handlers
 * through request extensions.
 *
 * Role checks are expressed as extractors: `AuthUser` accepts any account,
 * `StaffUser` accepts admins and staff, `AdminUser` accepts admins only.
 * A missing or invalid token is a 401, a role mismatch a 403.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::backend::auth::sessions::verify_token;
use crate::backend::auth::users::get_user_by_id;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::UserRole;

/// Authenticated user data attached by `auth_middleware`
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    /// Current role from the database, not the token
    pub role: UserRole,
}

/// Authentication middleware
///
/// This middleware:
/// 1. Extracts JWT token from Authorization header
/// 2. Verifies the token
/// 3. Loads the user so deleted accounts and role changes take effect at once
/// 4. Attaches user data to request extensions for use in handlers
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Authorization header");
            BackendError::Unauthorized
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid Authorization header format");
        BackendError::Unauthorized
    })?;

    let claims = verify_token(&app_state.config.jwt_secret, token).map_err(|e| {
        tracing::warn!("Invalid token: {:?}", e);
        BackendError::Unauthorized
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
        tracing::warn!("Invalid user ID in token: {:?}", e);
        BackendError::Unauthorized
    })?;

    let user = get_user_by_id(&app_state.db_pool, user_id).await?.ok_or_else(|| {
        tracing::warn!("Token for unknown user {}", user_id);
        BackendError::Unauthorized
    })?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: user.id,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Extract authenticated user from request extensions
pub fn extract_authenticated_user(parts: &Parts) -> Result<AuthenticatedUser, BackendError> {
    parts.extensions.get::<AuthenticatedUser>().cloned().ok_or_else(|| {
        tracing::warn!("AuthenticatedUser not found in request extensions");
        BackendError::Unauthorized
    })
}

/// Any authenticated account
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AuthUser(extract_authenticated_user(parts)?))
    }
}

/// Admin or staff account
#[derive(Clone, Debug)]
pub struct StaffUser(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for StaffUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = extract_authenticated_user(parts)?;
        if !user.role.is_staff() {
            tracing::warn!("User {} ({}) denied staff route", user.user_id, user.role.as_str());
            return Err(BackendError::forbidden("Staff access required"));
        }
        Ok(StaffUser(user))
    }
}

/// Admin account
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = extract_authenticated_user(parts)?;
        if user.role != UserRole::Admin {
            tracing::warn!("User {} ({}) denied admin route", user.user_id, user.role.as_str());
            return Err(BackendError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}
