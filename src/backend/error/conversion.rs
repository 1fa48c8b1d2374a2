/**
 * Error Conversion
 *
 * All backend errors implement `IntoResponse` from Axum, so handlers can
 * return them directly.
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "A reference is required for M-Pesa payments",
 *   "status": 400,
 *   "field": "reference"
 * }
 * ```
 *
 * `field` is only present for validation errors.
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("Request failed with {}: {:?}", status, self);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self);
        }

        let mut body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });
        if let Some(field) = self.field() {
            body["field"] = serde_json::Value::String(field.to_string());
        }

        (status, Json(body)).into_response()
    }
}

/// Convert bare status codes used by extractors into the JSON error shape
impl From<StatusCode> for BackendError {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
            other => BackendError::handler(
                other,
                other.canonical_reason().unwrap_or("Request failed"),
            ),
        }
    }
}
