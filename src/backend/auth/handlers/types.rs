/**
 * Authentication Handler Types
 *
 * This module defines the request and response types used by authentication handlers.
 * These types are shared across the signup, login, password and get_me handlers.
 */

use serde::{Deserialize, Serialize};

use crate::backend::auth::users::User;
use crate::backend::error::BackendError;
use crate::shared::student::{validate_email, validate_phone};
use crate::shared::UserRole;

/// Minimum password length for every account
pub const MIN_PASSWORD_LEN: usize = 8;

/// Sign up request for the first administrator
#[derive(Deserialize, Serialize, Debug)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    /// Will be hashed before storage
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Login request
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    /// Verified against the stored hash
    pub password: String,
}

/// Admin request creating a staff or admin account
#[derive(Deserialize, Serialize, Debug)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// `staff` (default) or `admin`
    #[serde(default = "default_staff_role")]
    pub role: UserRole,
}

fn default_staff_role() -> UserRole {
    UserRole::Staff
}

/// Parent self-registration
///
/// The phone number or email must match the parent contact recorded on at
/// least one student.
#[derive(Deserialize, Serialize, Debug)]
pub struct ParentSignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    /// Six digit code sent by email
    pub code: String,
    pub new_password: String,
}

/// Auth response
///
/// Returned by signup and login handlers. Contains the JWT token
/// and user information for immediate authentication.
#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    /// JWT token for authentication (30-day expiration)
    pub token: String,
    pub user: UserResponse,
}

/// Parent signup response with the students linked to the new account
#[derive(Serialize, Deserialize, Debug)]
pub struct ParentSignupResponse {
    pub token: String,
    pub user: UserResponse,
    pub linked_students: Vec<String>,
}

/// User response (without sensitive data)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
        }
    }
}

/// Plain acknowledgement
#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// Shared checks for name, email, password and optional phone
pub fn validate_account(name: &str, email: &str, password: &str, phone: Option<&str>) -> Result<(), BackendError> {
    if name.trim().is_empty() {
        return Err(BackendError::validation("name", "Name is required"));
    }
    validate_email("email", email)?;
    validate_password("password", password)?;
    if let Some(phone) = phone {
        validate_phone(phone).map_err(|_| BackendError::validation("phone", "Invalid phone number"))?;
    }
    Ok(())
}

pub fn validate_password(field: &str, password: &str) -> Result<(), BackendError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BackendError::validation(
            field,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_validation() {
        assert!(validate_account("Jane", "jane@school.ac.ke", "password123", None).is_ok());
        assert_eq!(
            validate_account("", "jane@school.ac.ke", "password123", None).unwrap_err().field(),
            Some("name")
        );
        assert_eq!(
            validate_account("Jane", "jane", "password123", None).unwrap_err().field(),
            Some("email")
        );
        assert_eq!(
            validate_account("Jane", "jane@school.ac.ke", "short", None).unwrap_err().field(),
            Some("password")
        );
        assert_eq!(
            validate_account("Jane", "jane@school.ac.ke", "password123", Some("12")).unwrap_err().field(),
            Some("phone")
        );
    }

    #[test]
    fn test_staff_role_defaults_to_staff() {
        let request: CreateStaffRequest = serde_json::from_str(
            r#"{"name":"Bursar","email":"bursar@school.ac.ke","password":"password123"}"#,
        )
        .unwrap();
        assert_eq!(request.role, UserRole::Staff);
    }
}
