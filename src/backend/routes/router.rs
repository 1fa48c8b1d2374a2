/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Groups
 *
 * 1. Public routes (health, login, signup, webhooks, USSD)
 * 2. API routes, all behind `auth_middleware`
 * 3. Fallback handler (JSON 404)
 *
 * The two groups are built as separate routers and merged so the
 * authentication layer never touches the public group.
 */

use axum::{http::StatusCode, middleware::from_fn_with_state, response::IntoResponse, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::backend::middleware::auth_middleware;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::public_routes::configure_public_routes;
use crate::backend::server::state::AppState;

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Application state shared with every handler
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub fn create_router(app_state: AppState) -> Router<()> {
    let public = configure_public_routes(Router::new());

    let protected = configure_api_routes(Router::new())
        .route_layer(from_fn_with_state(app_state.clone(), auth_middleware));

    public
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
