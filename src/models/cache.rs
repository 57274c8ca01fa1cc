use serde::{Deserialize, Serialize};

/// A keyed, versioned, checksummed blob cached for one (principal, device).
///
/// At most one entry exists per (principal_id, device_id, entity, key) -
/// writes are upserts, never appends.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub id: String,
    pub principal_id: String,
    pub device_id: String,
    pub entity: String,
    pub key: String,
    pub payload: serde_json::Value,
    /// Strictly increasing per key; whichever side last legitimately wrote
    /// the entry supplied it.
    pub version: i64,
    /// Deterministic content hash of `payload`, used to tell "same version,
    /// identical content" from "same version, diverged content".
    pub checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CacheEntry {
    /// TTL is advisory metadata; readers treat an expired entry as absent.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }
}

/// One client-held tuple from a device's offline write-ahead buffer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncItem {
    pub entity: String,
    pub key: String,
    pub payload: serde_json::Value,
    pub version: i64,
}

/// The server holds a newer value; the client should discard its local copy
/// and pull fresh data for this key.
#[derive(Debug, Clone, Serialize)]
pub struct SyncUpdated {
    pub entity: String,
    pub key: String,
    pub server_version: i64,
}

/// Same version on both sides but diverged content. Surfaced for the caller
/// to resolve out-of-band; neither side's write is applied.
#[derive(Debug, Clone, Serialize)]
pub struct SyncConflict {
    pub entity: String,
    pub key: String,
    pub server_version: i64,
    pub client_version: i64,
    pub server_checksum: String,
    pub client_checksum: String,
}

/// Per-item outcome of a reconciliation batch. Conflicts are normal output,
/// not errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub conflicts: Vec<SyncConflict>,
    pub updated: Vec<SyncUpdated>,
}
