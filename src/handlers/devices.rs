use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::middleware::AuthSession;
use crate::models::DeviceSession;

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/devices", get(list_devices))
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceSession>,
}

/// GET /auth/devices - every device this principal has authenticated from,
/// most recently active first. Guests have no device history.
pub async fn list_devices(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<DeviceListResponse>> {
    let devices = if auth.guest {
        Vec::new()
    } else {
        let conn = state.db.get()?;
        queries::list_device_sessions(&conn, &auth.principal_id)?
    };

    Ok(Json(DeviceListResponse { devices }))
}
