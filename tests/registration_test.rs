//! Tests for the registration flow

mod common;

use common::{create_test_server, register_user};
use serde_json::{json, Value};

/// Test: registration creates an unverified account and sends a link
#[tokio::test]
async fn test_register_creates_unverified_account() {
    let (server, mailer, _accounts) = create_test_server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "Secret123",
            "password_confirmation": "Secret123",
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["email_sent"], true);
    assert!(body["account_id"].as_u64().is_some());

    let token = mailer.get_token("alice@example.com");
    assert!(token.is_some());
    assert_eq!(token.unwrap().len(), 32);
}

/// Test: role hint "artist" is honored, "admin" is rejected
#[tokio::test]
async fn test_register_role_hints() {
    let (server, _mailer, _accounts) = create_test_server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "dj-salt",
            "email": "dj@example.com",
            "password": "Secret123",
            "password_confirmation": "Secret123",
            "role": "artist",
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    // Logging in reports the artist role for post-login routing
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "identifier": "dj-salt", "password": "Secret123" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["role"], "artist");

    // Admin is never self-assignable
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "sneaky",
            "email": "sneaky@example.com",
            "password": "Secret123",
            "password_confirmation": "Secret123",
            "role": "admin",
        }))
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: duplicate username is a conflict and issues no token
#[tokio::test]
async fn test_duplicate_username_conflict() {
    let (server, mailer, _accounts) = create_test_server();
    register_user(&server, &mailer, "alice", "alice@example.com", "Secret123").await;
    let sent_before = mailer.sent_count();

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "fresh@example.com",
            "password": "Secret123",
            "password_confirmation": "Secret123",
        }))
        .await;

    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    // No token was issued or mailed for the failed attempt
    assert_eq!(mailer.sent_count(), sent_before);
    assert!(mailer.get_token("fresh@example.com").is_none());
}

/// Test: duplicate email is rejected case-insensitively
#[tokio::test]
async fn test_duplicate_email_conflict_case_insensitive() {
    let (server, mailer, _accounts) = create_test_server();
    register_user(&server, &mailer, "alice", "alice@example.com", "Secret123").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice2",
            "email": "ALICE@example.com",
            "password": "Secret123",
            "password_confirmation": "Secret123",
        }))
        .await;

    assert_eq!(response.status_code(), 409);
}

/// Test: malformed input is rejected with 400
#[tokio::test]
async fn test_validation_errors() {
    let (server, _mailer, _accounts) = create_test_server();

    // Password too short
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "short",
            "password_confirmation": "short",
        }))
        .await;
    assert_eq!(response.status_code(), 400);

    // Confirmation mismatch
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "Secret123",
            "password_confirmation": "Secret124",
        }))
        .await;
    assert_eq!(response.status_code(), 400);

    // Bad email
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "not-an-email",
            "password": "Secret123",
            "password_confirmation": "Secret123",
        }))
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: mailer failure does not fail registration
#[tokio::test]
async fn test_mailer_failure_is_soft() {
    let (server, mailer, _accounts) = create_test_server();
    mailer.set_failing(true);

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "Secret123",
            "password_confirmation": "Secret123",
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["email_sent"], false);

    // The account exists: logging in works, and a resend recovers the link
    mailer.set_failing(false);
    let response = server
        .post("/api/auth/resend_verification")
        .json(&json!({ "email": "alice@example.com" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["email_sent"], true);
    assert!(mailer.get_token("alice@example.com").is_some());
}
