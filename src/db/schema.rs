use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;

        -- Principals (credential store - one row per registered account)
        -- Guests never appear here; they exist only inside signed tokens.
        CREATE TABLE IF NOT EXISTS principals (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            phone TEXT,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('user', 'publisher', 'admin')),
            status TEXT NOT NULL CHECK (status IN ('pending', 'active', 'suspended')),
            profile TEXT,
            otp_code_hash TEXT,
            otp_expires_at INTEGER,
            otp_verified_at INTEGER,
            reset_code_hash TEXT,
            reset_expires_at INTEGER,
            -- Fingerprint of the single currently-valid refresh token.
            -- Overwritten on every issue, cleared on logout.
            refresh_fingerprint TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_principals_email ON principals(email);

        -- Device sessions (rolling last-seen per (principal, device) pairing)
        CREATE TABLE IF NOT EXISTS device_sessions (
            id TEXT PRIMARY KEY,
            principal_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
            device_id TEXT NOT NULL,
            device_name TEXT,
            platform TEXT,
            app_version TEXT,
            last_ip TEXT,
            last_active_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(principal_id, device_id)
        );
        CREATE INDEX IF NOT EXISTS idx_device_sessions_principal_time
            ON device_sessions(principal_id, last_active_at DESC);

        -- Offline cache entries, scoped to (principal, device, entity, key).
        -- No foreign key to principals: stateless guest principals sync too.
        CREATE TABLE IF NOT EXISTS cache_entries (
            id TEXT PRIMARY KEY,
            principal_id TEXT NOT NULL,
            device_id TEXT NOT NULL,
            entity TEXT NOT NULL,
            key TEXT NOT NULL,
            payload TEXT NOT NULL,
            version INTEGER NOT NULL,
            checksum TEXT NOT NULL,
            expires_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(principal_id, device_id, entity, key)
        );
        CREATE INDEX IF NOT EXISTS idx_cache_entries_scope_time
            ON cache_entries(principal_id, device_id, entity, updated_at DESC);
        "#,
    )?;
    Ok(())
}
