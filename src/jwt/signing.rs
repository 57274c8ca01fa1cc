//! Symmetric token signing and verification.
//!
//! Access and refresh tokens share one server-held HS256 secret - both are
//! verifiable the same way, only their lifetimes differ. Verification is
//! pure computation and never touches the store.

use jwt_simple::prelude::*;

use super::SessionClaims;
use crate::error::{AppError, Result};

/// Build the signing key from the configured secret bytes.
pub fn signing_key(secret: &[u8]) -> HS256Key {
    HS256Key::from_bytes(secret)
}

/// Sign a claim set into a token with the given lifetime.
///
/// Every token gets a fresh `jti`, so two tokens minted for the same claims
/// in the same second are still distinct.
pub fn sign_claims(
    key: &HS256Key,
    claims: &SessionClaims,
    subject: &str,
    ttl_secs: u64,
) -> Result<String> {
    let jwt_claims = Claims::with_custom_claims(claims.clone(), Duration::from_secs(ttl_secs))
        .with_issuer("newsroom")
        .with_subject(subject)
        .with_jwt_id(uuid::Uuid::new_v4().to_string());

    key.authenticate(jwt_claims)
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify a token's signature and expiry, returning its claims.
///
/// Possession of a validly-signed, unexpired token is the sole authorization
/// proof; any failure collapses to Unauthorized.
pub fn verify_token(key: &HS256Key, token: &str) -> Result<JWTClaims<SessionClaims>> {
    key.verify_token::<SessionClaims>(token, None).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let key = signing_key(b"test-secret-test-secret-test-sec");

        let claims = SessionClaims::for_account("publisher", Some("p@x.com".to_string()));
        let token = sign_claims(&key, &claims, "nr_usr_0000", 900).unwrap();
        assert!(!token.is_empty());

        let verified = verify_token(&key, &token).unwrap();
        assert_eq!(verified.subject.as_deref(), Some("nr_usr_0000"));
        assert_eq!(verified.custom.role, "publisher");
        assert_eq!(verified.custom.email.as_deref(), Some("p@x.com"));
        assert!(!verified.custom.guest);
        assert!(verified.jwt_id.is_some());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let key = signing_key(b"test-secret-test-secret-test-sec");
        let other = signing_key(b"other-secret-other-secret-other!");

        let token =
            sign_claims(&key, &SessionClaims::for_guest(), "nr_gst_0000", 900).unwrap();
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let key = signing_key(b"test-secret-test-secret-test-sec");
        let token =
            sign_claims(&key, &SessionClaims::for_guest(), "nr_gst_0000", 900).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(verify_token(&key, &tampered).is_err());
    }
}
