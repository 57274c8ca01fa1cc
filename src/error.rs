use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error message constants.
///
/// Centralized so handlers and model validation return consistent wording
/// and tests can assert on exact messages.
pub mod msg {
    pub const EMAIL_EMPTY: &str = "Email cannot be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const NAME_EMPTY: &str = "Name cannot be empty";
    pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";
    pub const EMAIL_TAKEN: &str = "An account with this email already exists";
    pub const OTP_NOT_PENDING: &str = "No verification code is pending for this account";
    pub const OTP_EXPIRED: &str = "Verification code has expired";
    pub const OTP_MISMATCH: &str = "Verification code does not match";
    pub const RESET_NOT_REQUESTED: &str = "No password reset was requested for this account";
    pub const RESET_EXPIRED: &str = "Password reset code has expired";
    pub const RESET_MISMATCH: &str = "Password reset code does not match";
    pub const ENTITY_EMPTY: &str = "Entity kind cannot be empty";
    pub const KEY_EMPTY: &str = "Entry key cannot be empty";
    pub const DEVICE_ID_EMPTY: &str = "Device id cannot be empty";
    pub const CODE_REQUEST_GENERIC: &str =
        "If an account exists for this email, a reset code has been sent.";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Login attempted while a registration verification code is still
    /// outstanding. Distinct from plain Unauthorized so clients can route
    /// the user to the verification screen instead of the password prompt.
    #[error("Verification pending")]
    OtpPending,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::OtpPending => (
                StatusCode::UNAUTHORIZED,
                "Verification pending",
                Some("Account must verify its one-time code before logging in".to_string()),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg.clone())),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
