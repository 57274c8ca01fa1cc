//! Admin-only account status transitions: the `active -> suspended` and
//! `suspended -> active` edges of the status machine.

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::id::is_valid_prefixed_id;
use crate::middleware::AuthSession;
use crate::models::AccountStatus;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/principals/{id}/suspend", post(suspend_principal))
        .route("/admin/principals/{id}/reactivate", post(reactivate_principal))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub principal_id: String,
    pub status: AccountStatus,
}

fn set_status(
    state: &AppState,
    auth: &AuthSession,
    id: &str,
    status: AccountStatus,
) -> Result<StatusResponse> {
    auth.require_admin()?;

    if !is_valid_prefixed_id(id) {
        return Err(AppError::BadRequest("Invalid principal id".into()));
    }

    let conn = state.db.get()?;
    if !queries::set_principal_status(&conn, id, status)? {
        return Err(AppError::NotFound("Principal not found".into()));
    }

    tracing::info!(principal = %id, status = status.as_str(), "account status changed");
    Ok(StatusResponse {
        principal_id: id.to_string(),
        status,
    })
}

/// POST /admin/principals/{id}/suspend
///
/// Terminal until an admin reactivates: blocks login and refresh. Live
/// access tokens run out their natural expiry.
pub async fn suspend_principal(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    Ok(Json(set_status(&state, &auth, &id, AccountStatus::Suspended)?))
}

/// POST /admin/principals/{id}/reactivate
pub async fn reactivate_principal(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    Ok(Json(set_status(&state, &auth, &id, AccountStatus::Active)?))
}
