//! Reconciliation tests: the four per-item outcomes of POST /sync and the
//! cache read/delete surface around them.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

const DEVICE: &str = "phone-1";

async fn setup() -> (axum::Router, String) {
    let (app, _state) = test_app();
    let (_principal_id, tokens) = register_active(&app, "a@x.com", "password1").await;
    let token = tokens["access_token"].as_str().unwrap().to_string();
    (app, token)
}

async fn push(
    app: &axum::Router,
    token: &str,
    items: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_json_auth(
        app,
        "/sync",
        token,
        json!({ "device_id": DEVICE, "items": items }),
    )
    .await
}

async fn fetch(app: &axum::Router, token: &str, entity: &str, key: &str) -> serde_json::Value {
    let (status, body) = get_auth(
        app,
        &format!("/sync/cache/{}/{}?device_id={}", entity, key, DEVICE),
        token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "fetch failed: {}", body);
    body
}

#[tokio::test]
async fn test_first_sync_stores_items_at_client_version() {
    let (app, token) = setup().await;

    let (status, report) = push(
        &app,
        &token,
        json!([
            { "entity": "article", "key": "draft-1", "payload": { "title": "Hello" }, "version": 5 },
            { "entity": "event", "key": "ev-1", "payload": { "name": "Launch" }, "version": 2 },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 0);
    assert_eq!(report["updated"].as_array().unwrap().len(), 0);

    let entry = fetch(&app, &token, "article", "draft-1").await;
    assert_eq!(entry["version"], 5);
    assert_eq!(entry["payload"]["title"], "Hello");
    assert!(!entry["checksum"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_equal_version_equal_checksum_is_silent_noop() {
    let (app, token) = setup().await;

    let item = json!({ "entity": "article", "key": "a", "payload": { "title": "Same" }, "version": 5 });
    push(&app, &token, json!([item])).await;
    let before = fetch(&app, &token, "article", "a").await;

    // Steady state: same version, same content.
    let (status, report) = push(&app, &token, json!([item])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 0);
    assert_eq!(report["updated"].as_array().unwrap().len(), 0);

    let after = fetch(&app, &token, "article", "a").await;
    assert_eq!(before["version"], after["version"]);
    assert_eq!(before["checksum"], after["checksum"]);
    assert_eq!(before["updated_at"], after["updated_at"]);
}

#[tokio::test]
async fn test_equal_version_diverged_checksum_conflicts_without_write() {
    let (app, token) = setup().await;

    push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "a", "payload": { "title": "Server copy" }, "version": 5 }]),
    )
    .await;

    let (status, report) = push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "a", "payload": { "title": "Client copy" }, "version": 5 }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let conflicts = report["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["entity"], "article");
    assert_eq!(conflicts[0]["key"], "a");
    assert_eq!(conflicts[0]["server_version"], 5);
    assert_eq!(conflicts[0]["client_version"], 5);
    assert_ne!(conflicts[0]["server_checksum"], conflicts[0]["client_checksum"]);
    assert_eq!(report["updated"].as_array().unwrap().len(), 0);

    // No write happened: the server copy survives untouched.
    let entry = fetch(&app, &token, "article", "a").await;
    assert_eq!(entry["payload"]["title"], "Server copy");
    assert_eq!(entry["version"], 5);
}

#[tokio::test]
async fn test_server_newer_reports_updated_without_write() {
    let (app, token) = setup().await;

    push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "a", "payload": { "title": "Fresh" }, "version": 10 }]),
    )
    .await;

    // Stale client copy at a lower version.
    let (status, report) = push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "a", "payload": { "title": "Stale" }, "version": 3 }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let updated = report["updated"].as_array().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0]["key"], "a");
    assert_eq!(updated[0]["server_version"], 10);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 0);

    let entry = fetch(&app, &token, "article", "a").await;
    assert_eq!(entry["payload"]["title"], "Fresh");
    assert_eq!(entry["version"], 10);
}

#[tokio::test]
async fn test_client_newer_overwrites_with_fresh_server_version() {
    let (app, token) = setup().await;

    push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "a", "payload": { "title": "Old" }, "version": 5 }]),
    )
    .await;

    let (status, report) = push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "a", "payload": { "title": "New" }, "version": 6 }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 0);
    assert_eq!(report["updated"].as_array().unwrap().len(), 0);

    // The client won, but the server assigned its own fresh version.
    let entry = fetch(&app, &token, "article", "a").await;
    assert_eq!(entry["payload"]["title"], "New");
    assert!(entry["version"].as_i64().unwrap() > 6);
}

#[tokio::test]
async fn test_batch_is_applied_item_by_item() {
    let (app, token) = setup().await;

    push(
        &app,
        &token,
        json!([
            { "entity": "article", "key": "conflicted", "payload": { "v": "server" }, "version": 5 },
            { "entity": "article", "key": "behind", "payload": { "v": "server" }, "version": 9 },
        ]),
    )
    .await;

    // One new item, one conflict, one stale - all in a single batch.
    let (status, report) = push(
        &app,
        &token,
        json!([
            { "entity": "article", "key": "fresh", "payload": { "v": "client" }, "version": 1 },
            { "entity": "article", "key": "conflicted", "payload": { "v": "client" }, "version": 5 },
            { "entity": "article", "key": "behind", "payload": { "v": "client" }, "version": 2 },
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 1);
    assert_eq!(report["updated"].as_array().unwrap().len(), 1);

    // The clean item landed despite its neighbors.
    let entry = fetch(&app, &token, "article", "fresh").await;
    assert_eq!(entry["payload"]["v"], "client");
}

#[tokio::test]
async fn test_expired_entry_is_treated_as_absent() {
    let (app, token) = setup().await;

    // Direct save with an already-past TTL.
    let (status, _) = put_json_auth(
        &app,
        "/sync/cache/article/gone",
        &token,
        json!({ "device_id": DEVICE, "payload": { "title": "Stale" }, "expires_at": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Readers see nothing.
    let (status, _) = get_auth(
        &app,
        &format!("/sync/cache/article/gone?device_id={}", DEVICE),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The reconciler treats it as absent too: the client's copy lands as a
    // first sync, no conflict against the corpse.
    let (status, report) = push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "gone", "payload": { "title": "Live" }, "version": 1 }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 0);
    assert_eq!(report["updated"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_list_filters_by_entity_and_expiry() {
    let (app, token) = setup().await;

    push(
        &app,
        &token,
        json!([
            { "entity": "article", "key": "a1", "payload": { "n": 1 }, "version": 1 },
            { "entity": "article", "key": "a2", "payload": { "n": 2 }, "version": 1 },
            { "entity": "event", "key": "e1", "payload": { "n": 3 }, "version": 1 },
        ]),
    )
    .await;
    // And one expired entry that must not show up.
    put_json_auth(
        &app,
        "/sync/cache/article/dead",
        &token,
        json!({ "device_id": DEVICE, "payload": {}, "expires_at": 1 }),
    )
    .await;

    let (status, body) = get_auth(
        &app,
        &format!("/sync/cache?device_id={}&entity=article", DEVICE),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);

    let (status, body) = get_auth(&app, &format!("/sync/cache?device_id={}", DEVICE), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (app, token) = setup().await;

    push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "a", "payload": {}, "version": 1 }]),
    )
    .await;

    let (status, body) = delete_auth(
        &app,
        &format!("/sync/cache/article/a?device_id={}", DEVICE),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    // Second delete is a quiet no-op.
    let (status, body) = delete_auth(
        &app,
        &format!("/sync/cache/article/a?device_id={}", DEVICE),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], false);
}

#[tokio::test]
async fn test_sync_requires_a_valid_token() {
    let (app, _token) = setup().await;

    let (status, _) = post_json(
        &app,
        "/sync",
        json!({ "device_id": DEVICE, "items": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guests_can_sync_their_own_scope() {
    let (app, _state) = test_app();

    let (_, body) = post_json(&app, "/auth/guest", json!({})).await;
    let token = body["tokens"]["access_token"].as_str().unwrap().to_string();

    let (status, report) = push(
        &app,
        &token,
        json!([{ "entity": "article", "key": "bookmark", "payload": { "saved": true }, "version": 1 }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 0);

    let entry = fetch(&app, &token, "article", "bookmark").await;
    assert_eq!(entry["payload"]["saved"], true);
}

#[tokio::test]
async fn test_rejects_blank_entity_or_key() {
    let (app, token) = setup().await;

    let (status, _) = push(
        &app,
        &token,
        json!([{ "entity": " ", "key": "a", "payload": {}, "version": 1 }]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json_auth(
        &app,
        "/sync",
        &token,
        json!({ "device_id": "", "items": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
