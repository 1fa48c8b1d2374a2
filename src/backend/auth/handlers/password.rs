/**
 * Password Reset Handlers
 *
 * - `POST /api/auth/password/forgot` - email a one-time code
 * - `POST /api/auth/password/reset` - exchange the code for a new password
 *
 * `forgot` answers the same way whether or not the email is registered.
 */

use axum::{extract::State, response::Json};

use crate::backend::auth::handlers::types::{
    validate_password, ForgotPasswordRequest, MessageResponse, ResetPasswordRequest,
};
use crate::backend::auth::otp::{issue_otp, verify_otp};
use crate::backend::auth::users::{get_user_by_email, update_password};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::server::state::AppState;

const FORGOT_RESPONSE: &str = "If the email is registered, a reset code has been sent";

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> BackendResult<Json<MessageResponse>> {
    let ack = || Json(MessageResponse { message: FORGOT_RESPONSE.to_string() });

    let Some(user) = get_user_by_email(&state.db_pool, &request.email).await? else {
        tracing::info!("Password reset requested for unknown email {}", request.email);
        return Ok(ack());
    };

    let code = issue_otp(&state.store, &user.email, state.config.otp_ttl).await?;
    let minutes = state.config.otp_ttl.as_secs() / 60;
    let body = format!(
        "Hello {},\n\nYour {} password reset code is {}. It expires in {} minutes.\n\n\
         If you did not request a reset you can ignore this email.",
        user.name, state.config.school_name, code, minutes
    );

    if let Err(e) = state.mailer.send(&user.email, "Password reset code", &body).await {
        tracing::error!("Failed to send reset code to {}: {:?}", user.email, e);
    }
    Ok(ack())
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> BackendResult<Json<MessageResponse>> {
    validate_password("new_password", &request.new_password)?;

    let invalid = || BackendError::validation("code", "Invalid or expired reset code");
    if !verify_otp(&state.store, &request.email, &request.code).await? {
        tracing::warn!("Rejected reset code for {}", request.email);
        return Err(invalid());
    }
    let user = get_user_by_email(&state.db_pool, &request.email).await?.ok_or_else(invalid)?;

    update_password(&state.db_pool, user.id, request.new_password).await?;
    tracing::info!("Password reset for {}", user.email);
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}
