use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};

/// Last-known metadata for a (principal, physical device) pairing.
///
/// Upserted on every authenticated login/registration that supplies device
/// context. This is presence tracking, not an audit log - last write wins
/// and no history is retained.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSession {
    pub id: String,
    pub principal_id: String,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ip: Option<String>,
    pub last_active_at: i64,
    pub created_at: i64,
}

/// Device identity presented by a client on auth calls.
///
/// `device_id` is a client-generated stable identifier, persisted locally by
/// the client and resent on every call - the server never mints it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceContext {
    pub device_id: String,
    pub device_name: Option<String>,
    pub platform: Option<String>,
    pub app_version: Option<String>,
}

impl DeviceContext {
    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(AppError::BadRequest(msg::DEVICE_ID_EMPTY.into()));
        }
        Ok(())
    }
}
