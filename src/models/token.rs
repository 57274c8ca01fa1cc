use serde::{Deserialize, Serialize};

/// A signed credential pair for one principal.
///
/// Ephemeral - never persisted. Only the refresh token's fingerprint lands
/// in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_in: u64,
    pub refresh_expires_in: u64,
    /// True for stateless guest bundles with no backing account.
    pub guest: bool,
}
