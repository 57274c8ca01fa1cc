//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Parse a JSON text column, mapping malformed content to a column error.
fn parse_json<T: serde::de::DeserializeOwned>(
    row: &Row,
    col: usize,
    col_name: &str,
) -> rusqlite::Result<T> {
    let raw: String = row.get(col)?;
    serde_json::from_str(&raw).map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const PRINCIPAL_COLS: &str = "id, email, name, phone, password_hash, role, status, profile, \
     otp_code_hash, otp_expires_at, otp_verified_at, reset_code_hash, reset_expires_at, \
     refresh_fingerprint, created_at, updated_at";

pub const DEVICE_SESSION_COLS: &str = "id, principal_id, device_id, device_name, platform, \
     app_version, last_ip, last_active_at, created_at";

pub const CACHE_ENTRY_COLS: &str = "id, principal_id, device_id, entity, key, payload, version, \
     checksum, expires_at, created_at, updated_at";

// ============ FromRow impls ============

impl FromRow for Principal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let profile: Option<String> = row.get(7)?;
        let profile = match profile {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    7,
                    "profile".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?),
            None => None,
        };

        Ok(Principal {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            password_hash: row.get(4)?,
            role: parse_enum(row, 5, "role")?,
            status: parse_enum(row, 6, "status")?,
            profile,
            otp_code_hash: row.get(8)?,
            otp_expires_at: row.get(9)?,
            otp_verified_at: row.get(10)?,
            reset_code_hash: row.get(11)?,
            reset_expires_at: row.get(12)?,
            refresh_fingerprint: row.get(13)?,
            created_at: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }
}

impl FromRow for DeviceSession {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DeviceSession {
            id: row.get(0)?,
            principal_id: row.get(1)?,
            device_id: row.get(2)?,
            device_name: row.get(3)?,
            platform: row.get(4)?,
            app_version: row.get(5)?,
            last_ip: row.get(6)?,
            last_active_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for CacheEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CacheEntry {
            id: row.get(0)?,
            principal_id: row.get(1)?,
            device_id: row.get(2)?,
            entity: row.get(3)?,
            key: row.get(4)?,
            payload: parse_json(row, 5, "payload")?,
            version: row.get(6)?,
            checksum: row.get(7)?,
            expires_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
