/**
 * Backend Error Types
 *
 * This module defines the error type returned by every handler and service
 * function in the backend.
 *
 * # Error Categories
 *
 * ## Client errors
 *
 * - Validation failures (400) carry the offending field
 * - Missing or invalid credentials (401), insufficient role (403)
 * - Missing entities (404), duplicates and invalid state transitions (409)
 * - Fee configuration gaps (422)
 *
 * ## Server errors
 *
 * Database, serialization and integration failures map to 500/503. Their
 * details are logged but never returned to the client.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::SharedError;

/// Message returned for every unexpected failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use feedesk::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// let err = BackendError::not_found("Student ADM001 not found");
/// let err = BackendError::conflict("Reference already used");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error with an explicit status code
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Entity lookup failed
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Duplicate record or invalid state transition
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Authenticated but not allowed
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Pending payment has no student to apply it to
    #[error("Pending payment {reference} is not linked to a student")]
    NotLinked { reference: String },

    /// No fee structure matches the student's grade/boarding/transport
    #[error("No fee structure configured for {description}")]
    FeeStructureNotFound { description: String },

    /// Integration that is not configured or not reachable
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Validation or serialization error from the shared module
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Create a field-level validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SharedError(SharedError::validation(field, message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `SharedError` - 400 for validation, 500 for serialization
    /// - `NotFound` - 404, `Conflict`/`NotLinked` - 409, `Forbidden` - 403
    /// - `FeeStructureNotFound` - 422
    /// - `DatabaseError` - 404 for missing rows, 409 for unique violations, 500 otherwise
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotLinked { .. } => StatusCode::CONFLICT,
            Self::FeeStructureNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SharedError(err) => match err {
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::DatabaseError(err) => {
                if matches!(err, sqlx::Error::RowNotFound) {
                    StatusCode::NOT_FOUND
                } else if is_unique_violation(err) {
                    StatusCode::CONFLICT
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the client-facing error message
    ///
    /// Server-side failures collapse to a generic message so that database
    /// and integration details are never exposed.
    pub fn message(&self) -> String {
        if self.status_code().is_server_error() {
            return match self {
                Self::ServiceUnavailable { message } => message.clone(),
                _ => INTERNAL_ERROR_MESSAGE.to_string(),
            };
        }
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::NotFound { message }
            | Self::Conflict { message }
            | Self::Forbidden { message } => message.clone(),
            Self::Unauthorized => "Authentication required".to_string(),
            Self::SharedError(SharedError::ValidationError { message, .. }) => message.clone(),
            Self::DatabaseError(sqlx::Error::RowNotFound) => "Record not found".to_string(),
            Self::DatabaseError(_) => "Record already exists".to_string(),
            other => other.to_string(),
        }
    }

    /// Field name for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::SharedError(err) => err.field(),
            _ => None,
        }
    }
}

/// Whether a sqlx error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error() {
        let error = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
        match error {
            BackendError::HandlerError { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid request");
            }
            _ => panic!("Expected HandlerError"),
        }
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(BackendError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(BackendError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(BackendError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(BackendError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            BackendError::NotLinked { reference: "T1".to_string() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BackendError::FeeStructureNotFound { description: "Grade 9".to_string() }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(BackendError::validation("amount", "bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            BackendError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let error = BackendError::internal("disk full at /var/lib/feedesk");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message(), INTERNAL_ERROR_MESSAGE);

        let error = BackendError::DatabaseError(sqlx::Error::PoolTimedOut);
        assert_eq!(error.message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_validation_field_is_reported() {
        let error: BackendError = SharedError::validation("reference", "required").into();
        assert_eq!(error.field(), Some("reference"));
        assert_eq!(error.message(), "required");
    }

    #[test]
    fn test_not_linked_message() {
        let error = BackendError::NotLinked { reference: "PSK_123".to_string() };
        assert!(error.message().contains("PSK_123"));
    }
}
