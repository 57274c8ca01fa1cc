use std::env;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Token and one-time-code parameters.
///
/// Passed explicitly into the token issuer and handlers at construction so
/// they can be swapped out in tests without touching process environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric signing secret shared by access and refresh tokens.
    pub signing_secret: Vec<u8>,
    /// Access token lifetime in seconds (minutes-scale).
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds (days-scale).
    pub refresh_ttl_secs: u64,
    /// One-time code validity window in seconds.
    pub otp_ttl_secs: i64,
    /// Process-wide default for gating registration behind an OTP.
    pub require_otp: bool,
}

impl AuthConfig {
    pub fn new(signing_secret: Vec<u8>) -> Self {
        Self {
            signing_secret,
            access_ttl_secs: 900,
            refresh_ttl_secs: 30 * 86400,
            otp_ttl_secs: 600,
            require_otp: false,
        }
    }

    pub fn from_env() -> Self {
        let signing_secret = match env::var("NEWSROOM_JWT_SECRET") {
            Ok(b64) => BASE64
                .decode(b64.trim())
                .expect("NEWSROOM_JWT_SECRET must be valid base64"),
            Err(_) => {
                // Dev convenience only: an ephemeral secret means every token
                // dies with the process.
                tracing::warn!("NEWSROOM_JWT_SECRET not set, generating an ephemeral secret");
                use rand::RngCore;
                let mut secret = vec![0u8; 32];
                rand::rngs::OsRng.fill_bytes(&mut secret);
                secret
            }
        };

        let mut cfg = Self::new(signing_secret);
        if let Some(v) = env_parse("ACCESS_TOKEN_TTL_SECS") {
            cfg.access_ttl_secs = v;
        }
        if let Some(v) = env_parse("REFRESH_TOKEN_TTL_SECS") {
            cfg.refresh_ttl_secs = v;
        }
        if let Some(v) = env_parse("OTP_TTL_SECS") {
            cfg.otp_ttl_secs = v;
        }
        cfg.require_otp = env::var("REQUIRE_OTP")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);
        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    pub auth: AuthConfig,
    /// Requests per minute for credential endpoints (login, register, codes).
    pub rate_limit_strict_rpm: u32,
    /// Requests per minute for sync and session-read endpoints.
    pub rate_limit_standard_rpm: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("NEWSROOM_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env_parse("PORT").unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "newsroom.db".to_string()),
            dev_mode,
            auth: AuthConfig::from_env(),
            rate_limit_strict_rpm: env_parse("RATE_LIMIT_STRICT_RPM").unwrap_or(10),
            rate_limit_standard_rpm: env_parse("RATE_LIMIT_STANDARD_RPM").unwrap_or(60),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
