use serde::{Deserialize, Serialize};

/// Role string carried by guest tokens. Guests have no Credential Store
/// record, so the role never round-trips through the `Role` enum.
pub const GUEST_ROLE: &str = "guest";

/// Custom claims for Newsroom session tokens (non-standard JWT claims).
/// Standard claims (sub, jti, iat, exp) are handled by jwt-simple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Principal role at issue time ("user", "publisher", "admin", "guest").
    pub role: String,
    /// Login email; absent for guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Marks a stateless guest token with no backing account.
    #[serde(default)]
    pub guest: bool,
}

impl SessionClaims {
    pub fn for_account(role: &str, email: Option<String>) -> Self {
        Self {
            role: role.to_string(),
            email,
            guest: false,
        }
    }

    pub fn for_guest() -> Self {
        Self {
            role: GUEST_ROLE.to_string(),
            email: None,
            guest: true,
        }
    }
}
