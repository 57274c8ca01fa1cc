//! Rate limiting for the public auth/sync surface.
//!
//! Per-IP limits protect against DoS; the per-email limiter on code-request
//! endpoints stops an attacker burning through one-time codes for a single
//! account.
//!
//! Tiers:
//! - Strict: credential endpoints (register, login, code requests)
//! - Standard: sync and session-read endpoints
//!
//! Configure via environment variables:
//! - RATE_LIMIT_STRICT_RPM (default: 10)
//! - RATE_LIMIT_STANDARD_RPM (default: 60)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;

/// Rate limiter layer type alias using governor types directly
pub type RateLimitLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Creates a rate limiter layer with the specified requests per minute.
fn create_layer(requests_per_minute: u32) -> RateLimitLayer {
    assert!(requests_per_minute > 0, "Rate limit must be greater than 0");

    let period_secs = 60 / requests_per_minute as u64;
    let config = GovernorConfigBuilder::default()
        .period(Duration::from_secs(period_secs.max(1)))
        .burst_size(requests_per_minute)
        .finish()
        .expect("Failed to build rate limiter config");

    GovernorLayer::new(Arc::new(config))
}

/// Strict tier - credential endpoints that mint tokens or codes.
pub fn strict_layer(requests_per_minute: u32) -> RateLimitLayer {
    create_layer(requests_per_minute)
}

/// Standard tier - sync and session-read endpoints.
pub fn standard_layer(requests_per_minute: u32) -> RateLimitLayer {
    create_layer(requests_per_minute)
}

/// In-process sliding-window limiter keyed by an opaque string (an email
/// fingerprint in practice). Used for forgot-password and OTP reissue so
/// per-IP limits can't be sidestepped by rotating addresses.
#[derive(Clone)]
pub struct CodeRequestRateLimiter {
    max_per_window: usize,
    window_secs: i64,
    hits: Arc<Mutex<HashMap<String, Vec<i64>>>>,
}

impl CodeRequestRateLimiter {
    pub fn new(max_per_window: usize, window_secs: i64) -> Self {
        Self {
            max_per_window,
            window_secs,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 3 code requests per email per hour.
    pub fn default_for_codes() -> Self {
        Self::new(3, 3600)
    }

    /// Record an attempt for `key`. Err means the window is exhausted.
    pub fn check(&self, key: &str) -> Result<(), &'static str> {
        let now = Utc::now().timestamp();
        let floor = now - self.window_secs;

        let mut hits = self.hits.lock().expect("rate limiter mutex poisoned");
        let entry = hits.entry(key.to_string()).or_default();
        entry.retain(|&t| t > floor);

        if entry.len() >= self.max_per_window {
            return Err("rate limit exceeded");
        }
        entry.push(now);
        Ok(())
    }
}
