use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::crypto::{fingerprint, generate_numeric_code, payload_checksum};
use crate::error::{AppError, Result, msg};
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    CACHE_ENTRY_COLS, DEVICE_SESSION_COLS, PRINCIPAL_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// ============ Principals ============

/// Create a principal. A racing duplicate registration that slips past the
/// caller's existence check surfaces as Conflict via the UNIQUE(email)
/// constraint.
pub fn create_principal(conn: &Connection, input: &CreatePrincipal) -> Result<Principal> {
    let id = EntityType::Principal.gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();
    let profile_json = input
        .profile
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO principals (id, email, name, phone, password_hash, role, status, profile, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &id,
            &email,
            &input.name,
            &input.phone,
            &input.password_hash,
            input.role.as_str(),
            input.status.as_str(),
            &profile_json,
            now,
            now
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict(msg::EMAIL_TAKEN.into())
        }
        other => other.into(),
    })?;

    Ok(Principal {
        id,
        email,
        name: input.name.clone(),
        phone: input.phone.clone(),
        password_hash: input.password_hash.clone(),
        role: input.role,
        status: input.status,
        profile: input.profile.clone(),
        otp_code_hash: None,
        otp_expires_at: None,
        otp_verified_at: None,
        reset_code_hash: None,
        reset_expires_at: None,
        refresh_fingerprint: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_principal_by_id(conn: &Connection, id: &str) -> Result<Option<Principal>> {
    query_one(
        conn,
        &format!("SELECT {} FROM principals WHERE id = ?1", PRINCIPAL_COLS),
        &[&id],
    )
}

pub fn get_principal_by_email(conn: &Connection, email: &str) -> Result<Option<Principal>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM principals WHERE email = ?1", PRINCIPAL_COLS),
        &[&email],
    )
}

/// Generate a registration verification code for a principal.
///
/// Stores only the code's fingerprint and expiry; returns the plain code
/// exactly once for delivery. Re-issuing overwrites any previous code.
pub fn issue_otp(conn: &Connection, principal_id: &str, ttl_secs: i64) -> Result<String> {
    let code = generate_numeric_code();
    let now = now();
    conn.execute(
        "UPDATE principals
         SET otp_code_hash = ?2, otp_expires_at = ?3, updated_at = ?4
         WHERE id = ?1",
        params![principal_id, fingerprint(&code), now + ttl_secs, now],
    )?;
    Ok(code)
}

/// Clear OTP state, stamp the verification time, and activate the account.
pub fn mark_otp_verified(conn: &Connection, principal_id: &str) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE principals
         SET otp_code_hash = NULL, otp_expires_at = NULL, otp_verified_at = ?2,
             status = 'active', updated_at = ?2
         WHERE id = ?1",
        params![principal_id, now],
    )?;
    Ok(affected > 0)
}

/// Generate a password-reset code. Same mechanics as `issue_otp` but in
/// dedicated columns so an outstanding reset never blocks login.
pub fn issue_reset_code(conn: &Connection, principal_id: &str, ttl_secs: i64) -> Result<String> {
    let code = generate_numeric_code();
    let now = now();
    conn.execute(
        "UPDATE principals
         SET reset_code_hash = ?2, reset_expires_at = ?3, updated_at = ?4
         WHERE id = ?1",
        params![principal_id, fingerprint(&code), now + ttl_secs, now],
    )?;
    Ok(code)
}

/// Complete a password reset: swap the hash, clear the reset code, and kill
/// the stored refresh fingerprint so outstanding refresh tokens die with the
/// old password.
pub fn apply_password_reset(
    conn: &Connection,
    principal_id: &str,
    password_hash: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE principals
         SET password_hash = ?2, reset_code_hash = NULL, reset_expires_at = NULL,
             refresh_fingerprint = NULL, updated_at = ?3
         WHERE id = ?1",
        params![principal_id, password_hash, now()],
    )?;
    Ok(affected > 0)
}

/// Unconditionally overwrite (or clear) the stored refresh fingerprint.
/// This is what makes only the most recently issued refresh token valid.
pub fn set_refresh_fingerprint(
    conn: &Connection,
    principal_id: &str,
    fingerprint: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE principals SET refresh_fingerprint = ?2, updated_at = ?3 WHERE id = ?1",
        params![principal_id, fingerprint, now()],
    )?;
    Ok(affected > 0)
}

/// Rotate the refresh fingerprint, but only if it still holds the value the
/// caller just compared against. Two refreshes racing on the same stale
/// token cannot both win; the loser sees zero affected rows.
pub fn rotate_refresh_fingerprint(
    conn: &Connection,
    principal_id: &str,
    expected: &str,
    next: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE principals SET refresh_fingerprint = ?3, updated_at = ?4
         WHERE id = ?1 AND refresh_fingerprint = ?2",
        params![principal_id, expected, next, now()],
    )?;
    Ok(affected > 0)
}

/// Admin-driven status transition (suspend / reactivate).
pub fn set_principal_status(
    conn: &Connection,
    principal_id: &str,
    status: AccountStatus,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE principals SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![principal_id, status.as_str(), now()],
    )?;
    Ok(affected > 0)
}

// ============ Device sessions ============

/// Upsert the (principal, device) presence record. Unconditionally
/// overwrites name/platform/app-version/ip/last-seen; no history retained.
pub fn record_device_session(
    conn: &Connection,
    principal_id: &str,
    device: &DeviceContext,
    last_ip: Option<&str>,
) -> Result<DeviceSession> {
    let now = now();
    conn.execute(
        "INSERT INTO device_sessions
             (id, principal_id, device_id, device_name, platform, app_version, last_ip, last_active_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT(principal_id, device_id) DO UPDATE SET
             device_name = excluded.device_name,
             platform = excluded.platform,
             app_version = excluded.app_version,
             last_ip = excluded.last_ip,
             last_active_at = excluded.last_active_at",
        params![
            EntityType::DeviceSession.gen_id(),
            principal_id,
            &device.device_id,
            &device.device_name,
            &device.platform,
            &device.app_version,
            last_ip,
            now
        ],
    )?;

    let session = query_one(
        conn,
        &format!(
            "SELECT {} FROM device_sessions WHERE principal_id = ?1 AND device_id = ?2",
            DEVICE_SESSION_COLS
        ),
        &[&principal_id, &device.device_id.as_str()],
    )?;
    session.ok_or_else(|| AppError::Internal("Device upsert lost its row".into()))
}

/// All device sessions for a principal, most recently active first.
pub fn list_device_sessions(conn: &Connection, principal_id: &str) -> Result<Vec<DeviceSession>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM device_sessions WHERE principal_id = ?1 ORDER BY last_active_at DESC",
            DEVICE_SESSION_COLS
        ),
        &[&principal_id],
    )
}

// ============ Offline cache ============

/// Upsert a cache entry inside the caller's transaction (or connection, when
/// single-writer atomicity is already guaranteed by the caller).
///
/// `at_version` pins the stored version - the reconciler's first-sync case
/// keeps the client's version. When absent, a fresh server version is
/// assigned: wall-clock milliseconds, bumped past the previous version on
/// same-millisecond writes so the sequence stays strictly increasing.
///
/// `expires_at` is written as given, including clearing a previous TTL -
/// a write that revives an expired key must not leave the fresh value
/// looking expired.
pub fn save_cache_entry_within(
    conn: &Connection,
    principal_id: &str,
    device_id: &str,
    entity: &str,
    key: &str,
    payload: &serde_json::Value,
    expires_at: Option<i64>,
    at_version: Option<i64>,
) -> Result<CacheEntry> {
    let prev_version: Option<i64> = conn
        .query_row(
            "SELECT version FROM cache_entries
             WHERE principal_id = ?1 AND device_id = ?2 AND entity = ?3 AND key = ?4",
            params![principal_id, device_id, entity, key],
            |row| row.get(0),
        )
        .optional()?;

    let version = at_version.unwrap_or_else(|| {
        let candidate = now_ms();
        match prev_version {
            Some(prev) if candidate <= prev => prev + 1,
            _ => candidate,
        }
    });

    let now = now();
    conn.execute(
        "INSERT INTO cache_entries
             (id, principal_id, device_id, entity, key, payload, version, checksum, expires_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
         ON CONFLICT(principal_id, device_id, entity, key) DO UPDATE SET
             payload = excluded.payload,
             version = excluded.version,
             checksum = excluded.checksum,
             expires_at = excluded.expires_at,
             updated_at = excluded.updated_at",
        params![
            EntityType::CacheEntry.gen_id(),
            principal_id,
            device_id,
            entity,
            key,
            serde_json::to_string(payload)?,
            version,
            payload_checksum(payload),
            expires_at,
            now
        ],
    )?;

    let entry = get_cache_entry(conn, principal_id, device_id, entity, key)?;
    entry.ok_or_else(|| AppError::Internal("Cache upsert lost its row".into()))
}

/// Upsert a cache entry with its own read-compare-write transaction, so a
/// concurrent writer of the same key cannot slip between the version read
/// and the write.
#[allow(clippy::too_many_arguments)]
pub fn save_cache_entry(
    conn: &mut Connection,
    principal_id: &str,
    device_id: &str,
    entity: &str,
    key: &str,
    payload: &serde_json::Value,
    expires_at: Option<i64>,
    at_version: Option<i64>,
) -> Result<CacheEntry> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let entry = save_cache_entry_within(
        &tx,
        principal_id,
        device_id,
        entity,
        key,
        payload,
        expires_at,
        at_version,
    )?;
    tx.commit()?;
    Ok(entry)
}

pub fn get_cache_entry(
    conn: &Connection,
    principal_id: &str,
    device_id: &str,
    entity: &str,
    key: &str,
) -> Result<Option<CacheEntry>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM cache_entries
             WHERE principal_id = ?1 AND device_id = ?2 AND entity = ?3 AND key = ?4",
            CACHE_ENTRY_COLS
        ),
        &[&principal_id, &device_id, &entity, &key],
    )
}

/// All cache entries for a (principal, device), newest first, optionally
/// filtered by entity kind. Expiry filtering is the caller's job.
pub fn list_cache_entries(
    conn: &Connection,
    principal_id: &str,
    device_id: &str,
    entity: Option<&str>,
) -> Result<Vec<CacheEntry>> {
    match entity {
        Some(entity) => query_all(
            conn,
            &format!(
                "SELECT {} FROM cache_entries
                 WHERE principal_id = ?1 AND device_id = ?2 AND entity = ?3
                 ORDER BY updated_at DESC",
                CACHE_ENTRY_COLS
            ),
            &[&principal_id, &device_id, &entity],
        ),
        None => query_all(
            conn,
            &format!(
                "SELECT {} FROM cache_entries
                 WHERE principal_id = ?1 AND device_id = ?2
                 ORDER BY updated_at DESC",
                CACHE_ENTRY_COLS
            ),
            &[&principal_id, &device_id],
        ),
    }
}

/// Hard delete. Idempotent - returns false when nothing was there.
pub fn delete_cache_entry(
    conn: &Connection,
    principal_id: &str,
    device_id: &str,
    entity: &str,
    key: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM cache_entries
         WHERE principal_id = ?1 AND device_id = ?2 AND entity = ?3 AND key = ?4",
        params![principal_id, device_id, entity, key],
    )?;
    Ok(affected > 0)
}
