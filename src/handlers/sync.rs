//! Offline sync endpoints: the reconciliation push plus direct cache
//! reads/writes, so a client can pull fresh data for keys the reconciler
//! reported as `updated`.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::extractors::{Json, Path, Query};
use crate::middleware::AuthSession;
use crate::models::{CacheEntry, SyncItem, SyncReport};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", post(push_sync))
        .route("/sync/cache", get(list_entries))
        .route(
            "/sync/cache/{entity}/{key}",
            get(get_entry).put(save_entry).delete(delete_entry),
        )
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub device_id: String,
    pub items: Vec<SyncItem>,
}

/// POST /sync - push a device's offline write-ahead buffer.
///
/// Conflicts and server-newer keys come back in the report body; they are
/// expected output, not errors. Partial application across the batch is by
/// design.
pub async fn push_sync(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncReport>> {
    if body.device_id.trim().is_empty() {
        return Err(AppError::BadRequest(msg::DEVICE_ID_EMPTY.into()));
    }

    let mut conn = state.db.get()?;
    let report = crate::sync::reconcile(&mut conn, &auth.principal_id, &body.device_id, &body.items)?;

    tracing::debug!(
        principal = %auth.principal_id,
        device = %body.device_id,
        items = body.items.len(),
        conflicts = report.conflicts.len(),
        updated = report.updated.len(),
        "sync batch reconciled"
    );

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub device_id: String,
    pub entity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheListResponse {
    pub entries: Vec<CacheEntry>,
}

/// GET /sync/cache?device_id=...&entity=... - newest first; expired entries
/// are treated as absent.
pub async fn list_entries(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<CacheListResponse>> {
    let conn = state.db.get()?;
    let now = Utc::now().timestamp();

    let entries = queries::list_cache_entries(
        &conn,
        &auth.principal_id,
        &query.device_id,
        query.entity.as_deref(),
    )?
    .into_iter()
    .filter(|entry| !entry.is_expired(now))
    .collect();

    Ok(Json(CacheListResponse { entries }))
}

/// GET /sync/cache/{entity}/{key}?device_id=...
pub async fn get_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    Path((entity, key)): Path<(String, String)>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<CacheEntry>> {
    let conn = state.db.get()?;
    let now = Utc::now().timestamp();

    let entry = queries::get_cache_entry(&conn, &auth.principal_id, &query.device_id, &entity, &key)?
        .filter(|entry| !entry.is_expired(now))
        .ok_or_else(|| AppError::NotFound("Cache entry not found".into()))?;

    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct SaveEntryRequest {
    pub device_id: String,
    pub payload: serde_json::Value,
    pub expires_at: Option<i64>,
}

/// PUT /sync/cache/{entity}/{key} - direct save; the server assigns the
/// fresh version and checksum.
pub async fn save_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    Path((entity, key)): Path<(String, String)>,
    Json(body): Json<SaveEntryRequest>,
) -> Result<Json<CacheEntry>> {
    if body.device_id.trim().is_empty() {
        return Err(AppError::BadRequest(msg::DEVICE_ID_EMPTY.into()));
    }
    if entity.trim().is_empty() {
        return Err(AppError::BadRequest(msg::ENTITY_EMPTY.into()));
    }
    if key.trim().is_empty() {
        return Err(AppError::BadRequest(msg::KEY_EMPTY.into()));
    }

    let mut conn = state.db.get()?;
    let entry = queries::save_cache_entry(
        &mut conn,
        &auth.principal_id,
        &body.device_id,
        &entity,
        &key,
        &body.payload,
        body.expires_at,
        None,
    )?;

    Ok(Json(entry))
}

#[derive(Debug, Serialize)]
pub struct DeleteEntryResponse {
    pub deleted: bool,
}

/// DELETE /sync/cache/{entity}/{key}?device_id=... - idempotent hard delete.
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    Path((entity, key)): Path<(String, String)>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<DeleteEntryResponse>> {
    let conn = state.db.get()?;
    let deleted = queries::delete_cache_entry(
        &conn,
        &auth.principal_id,
        &query.device_id,
        &entity,
        &key,
    )?;

    Ok(Json(DeleteEntryResponse { deleted }))
}
