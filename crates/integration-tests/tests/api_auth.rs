//! HTTP behaviour of `/api/auth`.

use argon2::PasswordHash;
use auth_adapters::Argon2Hasher;
use axum::http::StatusCode;
use domains::{CredentialHasher, MAX_USERNAME_CHARS};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::Fake;
use integration_tests::{TestApp, SEED_PASSWORD};
use serde_json::json;
use services::auth::DUMMY_PASSWORD_HASH;

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::spawn().await;
    let username: String = Username().fake();
    let email: String = SafeEmail().fake();

    let (status, body) = app
        .post_json(
            "/api/auth/register",
            json!({ "username": username, "email": email, "password": "hunter2hunter2" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    let user_id = body["userId"].as_i64().unwrap();

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": email, "password": "hunter2hunter2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id);
    assert_eq!(body["user"]["username"], username.as_str());
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json(
            "/api/auth/register",
            json!({
                "username": "someone-else",
                "email": app.user.email,
                "password": "hunter2hunter2",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post_json(
            "/api/auth/register",
            json!({
                "username": app.user.username,
                "email": "fresh@example.com",
                "password": "hunter2hunter2",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn register_requires_every_field() {
    let app = TestApp::spawn().await;
    let cases = [
        json!({ "email": "a@example.com", "password": "hunter2hunter2" }),
        json!({ "username": "a", "password": "hunter2hunter2" }),
        json!({ "username": "a", "email": "a@example.com" }),
    ];
    for case in cases {
        let (status, _) = app.post_json("/api/auth/register", case).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": app.user.email, "password": "not the password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid email or password." }));
}

#[tokio::test]
async fn unknown_email_looks_like_wrong_password() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "ghost@example.com", "password": SEED_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid email or password." }));
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = TestApp::spawn().await;
    let (status, _) = app
        .post_json("/api/auth/login", json!({ "email": app.user.email }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn over_long_username_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let (status, body) = app
        .post_json(
            "/api/auth/register",
            json!({
                "username": "u".repeat(MAX_USERNAME_CHARS + 1),
                "email": "long@example.com",
                "password": "hunter2hunter2",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("username")));
    assert_eq!(app.store.user_count(), 1);
}

#[test]
fn unknown_email_check_runs_a_full_argon2_verification() {
    // A parseable hash means the hasher does the full computation and only
    // then reports a mismatch.
    tokio_test::assert_ok!(PasswordHash::new(DUMMY_PASSWORD_HASH));
    assert!(!Argon2Hasher::new().verify_password(SEED_PASSWORD, DUMMY_PASSWORD_HASH));
}
