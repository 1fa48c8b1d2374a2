//! Authentication API integration tests
//!
//! Tests for signup, login, staff accounts, parent signup and password reset.

mod common;

use axum::http::StatusCode;
use common::*;
use feedesk::backend::auth::otp::issue_otp;
use feedesk::backend::notifications::store::EphemeralStore;
use feedesk::shared::UserRole;
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn test_health_and_unknown_route() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");

    let response = app.server.get("/api/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_first_signup_creates_admin_then_closes() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({
            "name": "Head Teacher",
            "email": "head@school.ac.ke",
            "password": "password123"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["role"], "admin");

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({
            "name": "Second",
            "email": "second@school.ac.ke",
            "password": "password123"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new().await;
    let staff = create_staff(&app.pool).await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": staff.email, "password": staff.password }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let token = response.json::<Value>()["token"].as_str().unwrap().to_string();

    let response = app.server.get("/api/auth/me").authorization_bearer(&token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["email"], "bursar@school.ac.ke");
    assert_eq!(body["role"], "staff");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = TestApp::new().await;
    create_staff(&app.pool).await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "bursar@school.ac.ke", "password": "wrongpassword" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/students").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app.server.get("/api/auth/me").authorization_bearer("not-a-token").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_only_admin_creates_staff() {
    let app = TestApp::new().await;
    let admin = create_admin(&app.pool).await;
    let staff = create_staff(&app.pool).await;

    let request = json!({
        "name": "Accounts Clerk",
        "email": "clerk@school.ac.ke",
        "password": "password123"
    });

    let response = app
        .server
        .post("/api/auth/staff")
        .authorization_bearer(&staff.token)
        .json(&request)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .post("/api/auth/staff")
        .authorization_bearer(&admin.token)
        .json(&request)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["role"], "staff");
}

#[tokio::test]
async fn test_parent_signup_links_students_by_phone() {
    let app = TestApp::new().await;
    create_test_student(&app.pool, "ADM001", Some(15000.0)).await;

    let response = app
        .server
        .post("/api/auth/parent-signup")
        .json(&json!({
            "name": "Mary Otieno",
            "email": "mary.parent@example.com",
            "phone": "+254712345678",
            "password": "password123"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["role"], "parent");
    assert_eq!(body["linked_students"].as_array().unwrap().len(), 1);

    let token = body["token"].as_str().unwrap();
    let response = app.server.get("/api/parents/students").authorization_bearer(token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let students: Value = response.json();
    assert_eq!(students[0]["admission_number"], "ADM001");

    // Parents cannot reach staff endpoints
    let response = app.server.get("/api/students").authorization_bearer(token).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_parent_signup_without_matching_student() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/auth/parent-signup")
        .json(&json!({
            "name": "Stranger",
            "email": "stranger@example.com",
            "phone": "0799000000",
            "password": "password123"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    create_test_user(&app.pool, "clerk@school.ac.ke", UserRole::Staff).await;

    let response = app
        .server
        .post("/api/auth/password/forgot")
        .json(&json!({ "email": "clerk@school.ac.ke" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // The emailed code is not observable here, so issue a fresh one directly
    let store = EphemeralStore::new(app.pool.clone());
    let code = issue_otp(&store, "clerk@school.ac.ke", Duration::from_secs(600)).await.unwrap();

    let response = app
        .server
        .post("/api/auth/password/reset")
        .json(&json!({
            "email": "clerk@school.ac.ke",
            "code": code,
            "new_password": "brand-new-password"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "clerk@school.ac.ke", "password": "brand-new-password" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}
