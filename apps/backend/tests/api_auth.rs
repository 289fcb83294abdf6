//! Account and session API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable before running.

mod common;

use axum::http::StatusCode;

use common::fixtures;
use common::TestContext;

/// Test register, login, me and logout in sequence.
#[tokio::test]
#[ignore = "requires database"]
async fn test_register_login_me_logout() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let username = fixtures::unique_username("flow");

    let response = server
        .post("/api/auth/register")
        .json(&fixtures::credentials(&username, fixtures::PASSWORD))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], username.as_str());
    let user_id = uuid::Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap();

    let response = server
        .post("/api/auth/login")
        .json(&fixtures::credentials(&username, fixtures::PASSWORD))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert!(body.get("expires_at").is_some());

    let response = server
        .get("/api/auth/me")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], user_id.to_string());

    let response = server
        .post("/api/auth/logout")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .await;
    response.assert_status_ok();

    // Token is revoked after logout
    let response = server
        .get("/api/auth/me")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // Cleanup
    ctx.cleanup_user(user_id).await;
}

/// Test a taken username is rejected with conflict.
#[tokio::test]
#[ignore = "requires database"]
async fn test_register_duplicate_username() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let username = fixtures::unique_username("dup");

    let response = server
        .post("/api/auth/register")
        .json(&fixtures::credentials(&username, fixtures::PASSWORD))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let user_id = uuid::Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap();

    // Usernames are case-insensitive
    let response = server
        .post("/api/auth/register")
        .json(&fixtures::credentials(
            &username.to_uppercase(),
            fixtures::PASSWORD,
        ))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // Cleanup
    ctx.cleanup_user(user_id).await;
}

/// Test short passwords are rejected.
#[tokio::test]
#[ignore = "requires database"]
async fn test_register_short_password() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/api/auth/register")
        .json(&fixtures::credentials(
            &fixtures::unique_username("short"),
            "abc",
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

/// Test login with a wrong password.
#[tokio::test]
#[ignore = "requires database"]
async fn test_login_wrong_password() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let username = fixtures::unique_username("wrong");

    let response = server
        .post("/api/auth/register")
        .json(&fixtures::credentials(&username, fixtures::PASSWORD))
        .await;
    let body: serde_json::Value = response.json();
    let user_id = uuid::Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap();

    let response = server
        .post("/api/auth/login")
        .json(&fixtures::credentials(&username, "not the password"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "unauthorized");

    // Cleanup
    ctx.cleanup_user(user_id).await;
}

/// Test login for an unknown user.
#[tokio::test]
#[ignore = "requires database"]
async fn test_login_unknown_user() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/api/auth/login")
        .json(&fixtures::credentials(
            &fixtures::unique_username("ghost"),
            fixtures::PASSWORD,
        ))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

/// Test protected endpoints reject missing and bogus tokens.
#[tokio::test]
#[ignore = "requires database"]
async fn test_protected_routes_require_auth() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.get("/api/collections").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/collections")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value("deadbeef"),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/study/due")
        .add_header(axum::http::header::AUTHORIZATION, "Token abc".to_string())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

/// Test the health check is public.
#[tokio::test]
#[ignore = "requires database"]
async fn test_health_check() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}
