//! Test utilities and fixtures for Newsroom core integration tests

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::Value;
use tower::ServiceExt;

pub use newsroom_core::config::AuthConfig;
pub use newsroom_core::crypto;
pub use newsroom_core::db::{AppState, DbPool, init_db, queries};
pub use newsroom_core::jwt::TokenIssuer;
pub use newsroom_core::models::*;
pub use newsroom_core::rate_limit::CodeRequestRateLimiter;

/// Deterministic signing config for tests.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig::new(b"test-secret-test-secret-test-sec".to_vec())
}

/// In-memory pool with the schema initialized.
///
/// Size 1 on purpose: every `get()` hands back the same connection, so the
/// whole test sees one database.
pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    pool
}

/// In-memory connection for direct query tests.
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

pub fn test_state() -> AppState {
    let auth = test_auth_config();
    AppState {
        db: test_pool(),
        issuer: TokenIssuer::new(&auth),
        auth,
        code_rate_limiter: CodeRequestRateLimiter::default_for_codes(),
    }
}

/// The full core surface wired to fresh in-memory state.
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = newsroom_core::handlers::router().with_state(state.clone());
    (app, state)
}

/// Create a principal directly in the store.
pub fn create_test_principal(
    conn: &Connection,
    email: &str,
    password: &str,
    role: Role,
    status: AccountStatus,
) -> Principal {
    queries::create_principal(
        conn,
        &CreatePrincipal {
            email: email.to_string(),
            name: format!("Test {}", email),
            phone: None,
            password_hash: crypto::hash_password(password).unwrap(),
            role,
            status,
            profile: None,
        },
    )
    .expect("Failed to create test principal")
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: Value,
) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(token), None).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, Some(token), None).await
}

pub async fn put_json_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: Value,
) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, Some(token), None).await
}

/// Register an account with the OTP gate off; returns (principal_id, tokens).
pub async fn register_active(app: &Router, email: &str, password: &str) -> (String, Value) {
    let (status, body) = post_json(
        app,
        "/auth/register",
        serde_json::json!({
            "name": "Test Reader",
            "email": email,
            "password": password,
            "require_otp": false,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    assert_eq!(body["otp_required"], false);
    (
        body["principal_id"].as_str().unwrap().to_string(),
        body["tokens"].clone(),
    )
}
