//! Tests for POST /auth/refresh: rotation, logout, and the guest
//! short-circuit.
//!
//! The rotation invariant: after a successful refresh, the previously
//! issued refresh token is dead even though it was never explicitly
//! revoked - only the most recently issued one matches the stored
//! fingerprint.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

#[tokio::test]
async fn test_refresh_rotates_and_invalidates_previous_token() {
    let (app, _state) = test_app();
    let (_principal_id, tokens) = register_active(&app, "a@x.com", "password1").await;
    let first_refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": first_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second_refresh = body["tokens"]["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first_refresh, second_refresh);

    // The spent token no longer refreshes.
    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": first_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The fresh one does.
    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": second_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_then_refresh_fails() {
    let (app, _state) = test_app();
    let (_principal_id, tokens) = register_active(&app, "a@x.com", "password1").await;
    let access = tokens["access_token"].as_str().unwrap().to_string();
    let refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = post_auth(&app, "/auth/logout", &access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logged_out"], true);

    let (status, _) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The access token itself still verifies until natural expiry.
    let (status, _) = get_auth(&app, "/auth/devices", &access).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_second_login_invalidates_first_devices_refresh() {
    let (app, _state) = test_app();
    let (_principal_id, device_a_tokens) = register_active(&app, "a@x.com", "password1").await;

    // Same account, second device: the fingerprint is overwritten.
    let (status, body) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "a@x.com", "password": "password1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let device_b_refresh = body["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": device_a_tokens["refresh_token"] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": device_b_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let (app, _state) = test_app();
    let (_principal_id, tokens) = register_active(&app, "a@x.com", "password1").await;

    // Validly signed, but its fingerprint is not the stored one.
    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": tokens["access_token"] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_garbage_token_fails() {
    let (app, _state) = test_app();

    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": "not.a.token" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guest_refresh_is_stateless() {
    let (app, _state) = test_app();

    let (status, body) = post_json(&app, "/auth/guest", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let refresh = body["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokens"]["guest"], true);

    // No rotation state for guests: the original guest refresh token still
    // works, because nothing about it was ever persisted.
    let (status, _) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_suspended_account_cannot_refresh() {
    let (app, state) = test_app();
    let (principal_id, tokens) = register_active(&app, "s@x.com", "password1").await;

    {
        let conn = state.db.get().unwrap();
        queries::set_principal_status(&conn, &principal_id, AccountStatus::Suspended).unwrap();
    }

    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": tokens["refresh_token"] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_kills_outstanding_refresh() {
    let (app, state) = test_app();
    let (principal_id, tokens) = register_active(&app, "r@x.com", "password1").await;

    let code = {
        let conn = state.db.get().unwrap();
        queries::issue_reset_code(&conn, &principal_id, state.auth.otp_ttl_secs).unwrap()
    };
    let (status, _) = post_json(
        &app,
        "/auth/reset-password",
        json!({ "email": "r@x.com", "code": code, "new_password": "password2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": tokens["refresh_token"] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
