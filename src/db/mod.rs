mod from_row;
pub mod queries;
mod schema;

pub use from_row::{CACHE_ENTRY_COLS, DEVICE_SESSION_COLS, PRINCIPAL_COLS};
pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::AuthConfig;
use crate::jwt::TokenIssuer;
use crate::rate_limit::CodeRequestRateLimiter;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential store, device sessions, and offline cache.
    pub db: DbPool,
    /// Signs and verifies session tokens.
    pub issuer: TokenIssuer,
    /// OTP window and OTP-gate default (token lifetimes live in the issuer).
    pub auth: AuthConfig,
    /// Per-email limiter for code-request endpoints.
    pub code_rate_limiter: CodeRequestRateLimiter,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
