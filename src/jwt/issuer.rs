use jwt_simple::prelude::HS256Key;

use super::{SessionClaims, sign_claims, verify_token};
use crate::config::AuthConfig;
use crate::error::Result;
use crate::id::EntityType;
use crate::models::TokenBundle;

/// Creates signed, time-boxed credential pairs for a principal.
///
/// Constructed once from explicit [`AuthConfig`] and shared through app
/// state. Issuing is a pure function of inputs + secret + wall clock; no
/// store interaction happens here.
#[derive(Clone)]
pub struct TokenIssuer {
    key: HS256Key,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: super::signing_key(&config.signing_secret),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }
    }

    /// Issue an access/refresh pair from the same claim set but different
    /// lifetimes.
    pub fn issue(
        &self,
        subject: &str,
        role: &str,
        email: Option<String>,
        guest: bool,
    ) -> Result<TokenBundle> {
        let claims = if guest {
            SessionClaims::for_guest()
        } else {
            SessionClaims::for_account(role, email)
        };

        let access_token = sign_claims(&self.key, &claims, subject, self.access_ttl_secs)?;
        let refresh_token = sign_claims(&self.key, &claims, subject, self.refresh_ttl_secs)?;

        Ok(TokenBundle {
            access_token,
            refresh_token,
            access_expires_in: self.access_ttl_secs,
            refresh_expires_in: self.refresh_ttl_secs,
            guest,
        })
    }

    /// Issue a guest bundle under a freshly generated ephemeral subject.
    /// Returns the subject alongside the bundle.
    pub fn issue_guest(&self) -> Result<(String, TokenBundle)> {
        let subject = EntityType::Guest.gen_id();
        let bundle = self.issue(&subject, super::GUEST_ROLE, None, true)?;
        Ok((subject, bundle))
    }

    /// Verify any token this issuer signed (access or refresh - both carry
    /// the same claim shape and are checked the same way).
    pub fn verify(&self, token: &str) -> Result<jwt_simple::claims::JWTClaims<SessionClaims>> {
        verify_token(&self.key, token)
    }
}
