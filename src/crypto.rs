//! Password hashing, one-time codes, and credential fingerprints.
//!
//! Passwords are hashed with Argon2id (explicit params, random per-password
//! salt) and stored as `hex(salt):hex(hash)`. Refresh tokens and one-time
//! codes are high-entropy or short-lived, so they are stored as salted
//! SHA-256 fingerprints - the server never needs the raw value back, only
//! an equality check against a presented value.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

/// Argon2id memory cost in KiB (19 MiB, OWASP baseline).
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
/// Argon2id iteration count.
const ARGON2_ITERATIONS: u32 = 2;
/// Argon2id lanes.
const ARGON2_PARALLELISM: u32 = 1;
/// Derived hash and salt lengths in bytes.
const HASH_LEN: usize = 32;
const SALT_LEN: usize = 16;

/// Number of digits in generated one-time codes.
pub const OTP_CODE_LEN: u32 = 6;

fn argon2() -> Result<Argon2<'static>> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(HASH_LEN),
    )
    .map_err(|e| AppError::Internal(format!("Invalid Argon2 params: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password for storage.
///
/// Returns `hex(salt):hex(hash)` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LEN];
    argon2()?
        .hash_password_into(password.as_bytes(), &salt, &mut hash)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(format!("{}:{}", hex::encode(salt), hex::encode(hash)))
}

/// Verify a password against a stored `hex(salt):hex(hash)` string.
///
/// Re-derives the hash with the stored salt and compares in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let Some((salt_hex, hash_hex)) = stored.split_once(':') else {
        return Err(AppError::Internal("Malformed password hash".into()));
    };

    let salt = hex::decode(salt_hex)
        .map_err(|_| AppError::Internal("Malformed password hash salt".into()))?;
    let expected = hex::decode(hash_hex)
        .map_err(|_| AppError::Internal("Malformed password hash digest".into()))?;

    let mut derived = [0u8; HASH_LEN];
    argon2()?
        .hash_password_into(password.as_bytes(), &salt, &mut derived)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

    Ok(derived.ct_eq(expected.as_slice()).into())
}

/// Fingerprint a secret for storage and lookup (refresh tokens, one-time
/// codes). SHA-256 with an application salt, lowercase hex.
pub fn fingerprint(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"newsroom-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a presented secret against a stored fingerprint in constant time.
pub fn fingerprint_matches(presented: &str, stored: &str) -> bool {
    fingerprint(presented)
        .as_bytes()
        .ct_eq(stored.as_bytes())
        .into()
}

/// Deterministic content hash of a cache payload, lowercase hex.
///
/// `serde_json` serializes object keys in sorted order, so equal values
/// always produce equal checksums regardless of the key order a client
/// sent them in.
pub fn payload_checksum(payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a numeric one-time code (zero-padded, `OTP_CODE_LEN` digits).
pub fn generate_numeric_code() -> String {
    // Rejection-free: 4 random bytes give us far more than 10^6 states.
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    let n = u32::from_le_bytes(bytes) % 10u32.pow(OTP_CODE_LEN);
    format!("{:0width$}", n, width = OTP_CODE_LEN as usize)
}
