//! Authentication test helpers
//!
//! Provides utilities for creating test users and generating tokens.

use feedesk::backend::auth::sessions::create_token;
use feedesk::backend::auth::users::{create_user, NewUser};
use feedesk::shared::UserRole;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::TEST_JWT_SECRET;

/// Test user credentials
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub token: String,
}

/// Create a user with the given role and a valid token
pub async fn create_test_user(pool: &SqlitePool, email: &str, role: UserRole) -> TestUser {
    let password = "test_password_123".to_string();
    let user = create_user(
        pool,
        NewUser {
            name: format!("{} user", role.as_str()),
            email: email.to_string(),
            phone: None,
            password: password.clone(),
            role,
        },
    )
    .await
    .expect("Failed to create test user");

    let token = create_token(TEST_JWT_SECRET, user.id, &user.email, user.role).expect("Failed to create test token");

    TestUser {
        id: user.id,
        email: user.email,
        password,
        token,
    }
}

pub async fn create_staff(pool: &SqlitePool) -> TestUser {
    create_test_user(pool, "bursar@school.ac.ke", UserRole::Staff).await
}

pub async fn create_admin(pool: &SqlitePool) -> TestUser {
    create_test_user(pool, "head@school.ac.ke", UserRole::Admin).await
}
