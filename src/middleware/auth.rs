//! Access-token authentication for protected endpoints.
//!
//! The [`AuthSession`] extractor is the boundary the rest of the system
//! consumes: downstream collaborators (content CRUD and friends) get a
//! validated `{principal_id, role}` out of a verified bearer token and never
//! see this core's internals. Verification is pure signature checking - no
//! store round-trip, which is what lets guest tokens work with no backing
//! account.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::AppState;
use crate::error::AppError;
use crate::util::extract_bearer_token;

/// The authenticated caller of a protected endpoint.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub principal_id: String,
    /// Role string from the token ("user", "publisher", "admin", "guest").
    pub role: String,
    pub email: Option<String>,
    pub guest: bool,
}

impl AuthSession {
    /// Guard for admin-only endpoints.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == "admin" {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin role required".into()))
        }
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = state.issuer.verify(token)?;
        let principal_id = claims.subject.ok_or(AppError::Unauthorized)?;

        Ok(AuthSession {
            principal_id,
            role: claims.custom.role,
            email: claims.custom.email,
            guest: claims.custom.guest,
        })
    }
}
