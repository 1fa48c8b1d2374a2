/**
 * Account Creation Handlers
 *
 * - `POST /api/auth/signup` - bootstrap the first administrator
 * - `POST /api/auth/staff` - admin creates a staff or admin account
 * - `POST /api/auth/parent-signup` - parent self-registration
 *
 * # Registration Process
 *
 * 1. Validate name, email, password length (and phone for parents)
 * 2. Check the caller is allowed to create this kind of account
 * 3. Hash password using bcrypt and create the user
 * 4. Generate JWT token (signup and parent signup only)
 *
 * # Security
 *
 * - Open signup only works until an admin exists; after that accounts are
 *   created by admins
 * - Parents can only register with a contact already on a student record
 * - Duplicate emails are rejected with 409
 */

use axum::{extract::State, http::StatusCode, response::Json};
use uuid::Uuid;

use crate::backend::auth::handlers::types::{
    validate_account, AuthResponse, CreateStaffRequest, ParentSignupRequest, ParentSignupResponse, SignupRequest,
    UserResponse,
};
use crate::backend::auth::sessions::create_token;
use crate::backend::auth::users::{count_admins, create_user, NewUser, User};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::AdminUser;
use crate::backend::server::state::AppState;
use crate::backend::students::db::{find_students_by_parent_contact, link_parent};
use crate::shared::UserRole;

pub(crate) fn issue_token(state: &AppState, user: &User) -> BackendResult<String> {
    create_token(&state.config.jwt_secret, user.id, &user.email, user.role).map_err(|e| {
        tracing::error!("Failed to create token: {:?}", e);
        BackendError::internal("failed to create token")
    })
}

/// Sign up handler
///
/// Creates the first administrator account. Once any admin exists the
/// endpoint answers 403 and further accounts go through `create_staff`.
///
/// # Errors
///
/// * `400 Bad Request` - invalid name, email or password
/// * `403 Forbidden` - an administrator already exists
/// * `409 Conflict` - email already registered
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> BackendResult<(StatusCode, Json<AuthResponse>)> {
    tracing::info!("Signup request for {}", request.email);
    validate_account(&request.name, &request.email, &request.password, request.phone.as_deref())?;

    if count_admins(&state.db_pool).await? > 0 {
        tracing::warn!("Signup refused for {}: an administrator already exists", request.email);
        return Err(BackendError::forbidden(
            "Signup is closed. Ask an administrator to create your account",
        ));
    }

    let user = create_user(
        &state.db_pool,
        NewUser {
            name: request.name,
            email: request.email,
            phone: request.phone,
            password: request.password,
            role: UserRole::Admin,
        },
    )
    .await?;
    let token = issue_token(&state, &user)?;

    tracing::info!("Administrator created: {} ({})", user.name, user.email);
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user: user.into() })))
}

/// Create a staff or admin account (admin only)
pub async fn create_staff(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateStaffRequest>,
) -> BackendResult<(StatusCode, Json<UserResponse>)> {
    validate_account(&request.name, &request.email, &request.password, request.phone.as_deref())?;
    if !request.role.is_staff() {
        return Err(BackendError::validation(
            "role",
            "Parents register through parent signup",
        ));
    }

    let user = create_user(
        &state.db_pool,
        NewUser {
            name: request.name,
            email: request.email,
            phone: request.phone,
            password: request.password,
            role: request.role,
        },
    )
    .await?;

    tracing::info!("{} created {} account {}", admin.email, user.role.as_str(), user.email);
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Parent self-registration
///
/// Every student whose parent phone or email matches and that is not yet
/// linked to another account is linked to the new parent.
///
/// # Errors
///
/// * `404 Not Found` - no student lists this phone number or email
/// * `403 Forbidden` - all matching students belong to another parent account
/// * `409 Conflict` - email already registered
pub async fn parent_signup(
    State(state): State<AppState>,
    Json(request): Json<ParentSignupRequest>,
) -> BackendResult<(StatusCode, Json<ParentSignupResponse>)> {
    validate_account(&request.name, &request.email, &request.password, Some(&request.phone))?;

    let matches = find_students_by_parent_contact(&state.db_pool, Some(&request.phone), Some(&request.email)).await?;
    if matches.is_empty() {
        tracing::warn!("Parent signup for {} matched no student", request.email);
        return Err(BackendError::not_found(
            "No student is registered with this phone number or email",
        ));
    }

    let unclaimed: Vec<(Uuid, String)> = matches
        .into_iter()
        .filter(|s| s.parent_user_id.is_none())
        .map(|s| (s.id, s.admission_number))
        .collect();
    if unclaimed.is_empty() {
        return Err(BackendError::forbidden(
            "These students are already linked to a parent account",
        ));
    }

    let user = create_user(
        &state.db_pool,
        NewUser {
            name: request.name,
            email: request.email,
            phone: Some(request.phone),
            password: request.password,
            role: UserRole::Parent,
        },
    )
    .await?;

    for (student_id, _) in &unclaimed {
        link_parent(&state.db_pool, *student_id, user.id).await?;
    }
    let token = issue_token(&state, &user)?;
    let linked_students: Vec<String> = unclaimed.into_iter().map(|(_, admission)| admission).collect();

    tracing::info!("Parent {} registered for {}", user.email, linked_students.join(", "));
    Ok((
        StatusCode::CREATED,
        Json(ParentSignupResponse {
            token,
            user: user.into(),
            linked_students,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::memory_pool;
    use crate::backend::students::db::{insert_student, require_student};
    use crate::shared::student::CreateStudentRequest;
    use crate::shared::{AppConfig, BoardingStatus};

    async fn state() -> AppState {
        let pool = memory_pool().await.unwrap();
        let config = AppConfig::builder().jwt_secret("test-secret").build().unwrap();
        AppState::new(config, pool).unwrap()
    }

    fn admin_request(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Head Teacher".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            phone: None,
        }
    }

    fn parent_request(phone: &str) -> ParentSignupRequest {
        ParentSignupRequest {
            name: "Mary Otieno".to_string(),
            email: "mary@example.com".to_string(),
            phone: phone.to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_signup_creates_admin_then_closes() {
        let state = state().await;
        let (status, Json(response)) = signup(State(state.clone()), Json(admin_request("head@school.ac.ke")))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.user.role, UserRole::Admin);
        assert!(!response.token.is_empty());

        let err = signup(State(state), Json(admin_request("other@school.ac.ke"))).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_signup_short_password() {
        let state = state().await;
        let mut request = admin_request("head@school.ac.ke");
        request.password = "short".to_string();
        let err = signup(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parent_signup_links_matching_students() {
        let state = state().await;
        insert_student(
            &state.db_pool,
            &CreateStudentRequest {
                admission_number: "ADM001".to_string(),
                name: "Achieng Otieno".to_string(),
                grade_level: "Grade 3".to_string(),
                boarding_status: BoardingStatus::Day,
                has_transport: false,
                transport_route: None,
                parent_name: "Mary Otieno".to_string(),
                parent_phone: "0712345678".to_string(),
                parent_email: None,
            },
            None,
        )
        .await
        .unwrap();

        let err = parent_signup(State(state.clone()), Json(parent_request("0799999999")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let (_, Json(response)) = parent_signup(State(state.clone()), Json(parent_request("+254712345678")))
            .await
            .unwrap();
        assert_eq!(response.linked_students, vec!["ADM001".to_string()]);
        assert_eq!(response.user.role, UserRole::Parent);

        let student = require_student(&state.db_pool, "ADM001").await.unwrap();
        assert_eq!(student.parent_user_id.map(|id| id.to_string()), Some(response.user.id));

        let mut second = parent_request("0712345678");
        second.email = "someone.else@example.com".to_string();
        let err = parent_signup(State(state), Json(second)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
