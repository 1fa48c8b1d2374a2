/**
 * Public Route Handlers
 *
 * Routes reachable without a bearer token. Each one authenticates its
 * caller some other way or exposes nothing sensitive:
 *
 * - Account bootstrap and login issue tokens
 * - Gateway webhooks are verified by HMAC signature
 * - USSD callbacks only reveal balances to the registered parent phone
 */

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::backend::auth::{forgot_password, login, parent_signup, reset_password, signup};
use crate::backend::notifications::ussd::ussd_callback;
use crate::backend::server::state::AppState;
use crate::backend::webhooks::handlers::payment_webhook;

/// Liveness check
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Configure public routes
///
/// - `GET /health` - Liveness check
/// - `POST /api/auth/signup` - First administrator account
/// - `POST /api/auth/login` - User login
/// - `POST /api/auth/parent-signup` - Parent self-registration
/// - `POST /api/auth/password/forgot` - Email a reset code
/// - `POST /api/auth/password/reset` - Set a new password with a reset code
/// - `POST /api/webhooks/payments` - Payment gateway events (signed)
/// - `POST /api/ussd` - USSD gateway callback
pub fn configure_public_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/parent-signup", post(parent_signup))
        .route("/api/auth/password/forgot", post(forgot_password))
        .route("/api/auth/password/reset", post(reset_password))
        .route("/api/webhooks/payments", post(payment_webhook))
        .route("/api/ussd", post(ussd_callback))
}
