//! Session lifecycle endpoints: registration (with optional OTP gate),
//! login, token refresh/rotation, logout, password reset, guest sessions.
//!
//! One-time codes are handed to the notification system for delivery and
//! never appear in responses; the OTP gate returns `otp_required` with no
//! tokens, and the caller must come back through `/auth/verify-otp` and
//! `/auth/login`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::middleware::AuthSession;
use crate::models::{
    AccountStatus, CreatePrincipal, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, Role, TokenBundle, VerifyOtpRequest,
};
use crate::util::extract_client_ip;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/guest", post(guest_session))
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub principal_id: String,
    pub otp_required: bool,
    /// Absent while an OTP is pending - the caller must not treat an
    /// OTP-gated registration as a usable session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenBundle>,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    body.validate()?;
    let conn = state.db.get()?;

    if queries::get_principal_by_email(&conn, &body.email)?.is_some() {
        return Err(AppError::Conflict(msg::EMAIL_TAKEN.into()));
    }

    let require_otp = body.require_otp.unwrap_or(state.auth.require_otp);
    let principal = queries::create_principal(
        &conn,
        &CreatePrincipal {
            email: body.email.clone(),
            name: body.name.clone(),
            phone: body.phone.clone(),
            password_hash: crypto::hash_password(&body.password)?,
            role: body.role.unwrap_or(Role::User),
            status: if require_otp {
                AccountStatus::Pending
            } else {
                AccountStatus::Active
            },
            profile: body.profile.clone(),
        },
    )?;

    if require_otp {
        // Code goes out through the notification system; the registration
        // response carries no usable session.
        let _code = queries::issue_otp(&conn, &principal.id, state.auth.otp_ttl_secs)?;
        tracing::info!(principal = %principal.id, "registration gated behind verification code");
        return Ok(Json(RegisterResponse {
            principal_id: principal.id,
            otp_required: true,
            tokens: None,
        }));
    }

    let bundle = state.issuer.issue(
        &principal.id,
        principal.role.as_str(),
        Some(principal.email.clone()),
        false,
    )?;
    queries::set_refresh_fingerprint(
        &conn,
        &principal.id,
        Some(&crypto::fingerprint(&bundle.refresh_token)),
    )?;

    if let Some(ref device) = body.device {
        queries::record_device_session(
            &conn,
            &principal.id,
            device,
            extract_client_ip(&headers).as_deref(),
        )?;
    }

    Ok(Json(RegisterResponse {
        principal_id: principal.id,
        otp_required: false,
        tokens: Some(bundle),
    }))
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub verified: bool,
}

/// POST /auth/verify-otp
///
/// Clears the code, stamps the verification time, and activates the
/// account. Issues no tokens - the caller logs in separately.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>> {
    let conn = state.db.get()?;

    let principal = queries::get_principal_by_email(&conn, &body.email)?
        .ok_or_else(|| AppError::BadRequest(msg::OTP_NOT_PENDING.into()))?;

    let Some(ref stored) = principal.otp_code_hash else {
        return Err(AppError::BadRequest(msg::OTP_NOT_PENDING.into()));
    };
    if principal
        .otp_expires_at
        .is_none_or(|exp| Utc::now().timestamp() > exp)
    {
        return Err(AppError::BadRequest(msg::OTP_EXPIRED.into()));
    }
    if !crypto::fingerprint_matches(&body.code, stored) {
        return Err(AppError::BadRequest(msg::OTP_MISMATCH.into()));
    }

    queries::mark_otp_verified(&conn, &principal.id)?;

    Ok(Json(VerifyOtpResponse { verified: true }))
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal_id: String,
    pub role: Role,
    pub tokens: TokenBundle,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    body.validate()?;
    let conn = state.db.get()?;

    let Some(principal) = queries::get_principal_by_email(&conn, &body.email)? else {
        return Err(AppError::Unauthorized);
    };
    if !crypto::verify_password(&body.password, &principal.password_hash)? {
        return Err(AppError::Unauthorized);
    }
    if principal.status == AccountStatus::Suspended {
        return Err(AppError::Unauthorized);
    }
    // A correct password does not get past an unverified registration.
    if principal.otp_pending() {
        return Err(AppError::OtpPending);
    }
    if principal.status != AccountStatus::Active {
        return Err(AppError::Unauthorized);
    }

    let bundle = state.issuer.issue(
        &principal.id,
        principal.role.as_str(),
        Some(principal.email.clone()),
        false,
    )?;
    queries::set_refresh_fingerprint(
        &conn,
        &principal.id,
        Some(&crypto::fingerprint(&bundle.refresh_token)),
    )?;

    if let Some(ref device) = body.device {
        queries::record_device_session(
            &conn,
            &principal.id,
            device,
            extract_client_ip(&headers).as_deref(),
        )?;
    }

    Ok(Json(LoginResponse {
        principal_id: principal.id,
        role: principal.role,
        tokens: bundle,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub tokens: TokenBundle,
}

/// POST /auth/refresh
///
/// Exchanges a refresh token for a new pair. Guest tokens short-circuit to
/// a stateless re-issue; account tokens are checked against the stored
/// fingerprint and rotated, so the presented token is dead after this call
/// whether or not anyone ever revokes it.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let claims = state.issuer.verify(&body.refresh_token)?;
    let subject = claims.subject.ok_or(AppError::Unauthorized)?;

    if claims.custom.guest {
        let tokens = state
            .issuer
            .issue(&subject, crate::jwt::GUEST_ROLE, None, true)?;
        return Ok(Json(RefreshResponse { tokens }));
    }

    let conn = state.db.get()?;
    let Some(principal) = queries::get_principal_by_id(&conn, &subject)? else {
        return Err(AppError::Unauthorized);
    };
    if principal.status == AccountStatus::Suspended {
        return Err(AppError::Unauthorized);
    }
    let Some(ref stored) = principal.refresh_fingerprint else {
        return Err(AppError::Unauthorized);
    };
    if !crypto::fingerprint_matches(&body.refresh_token, stored) {
        return Err(AppError::Unauthorized);
    }

    let tokens = state.issuer.issue(
        &principal.id,
        principal.role.as_str(),
        Some(principal.email.clone()),
        false,
    )?;

    // Conditional rotation: if another refresh won the race since our read,
    // zero rows match and this call loses cleanly.
    let rotated = queries::rotate_refresh_fingerprint(
        &conn,
        &principal.id,
        stored,
        &crypto::fingerprint(&tokens.refresh_token),
    )?;
    if !rotated {
        return Err(AppError::Unauthorized);
    }

    Ok(Json(RefreshResponse { tokens }))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// POST /auth/logout
///
/// Clears the stored refresh fingerprint. Outstanding access tokens remain
/// valid until natural expiry - there is no revocation list.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<LogoutResponse>> {
    if !auth.guest {
        let conn = state.db.get()?;
        queries::set_refresh_fingerprint(&conn, &auth.principal_id, None)?;
    }
    Ok(Json(LogoutResponse { logged_out: true }))
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    /// Generic on purpose - the same message whether the account exists or
    /// not, to prevent account enumeration.
    pub message: &'static str,
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>> {
    let generic = ForgotPasswordResponse {
        message: msg::CODE_REQUEST_GENERIC,
    };

    let email_key = crypto::fingerprint(&body.email.trim().to_lowercase());
    if state.code_rate_limiter.check(&email_key).is_err() {
        tracing::warn!("reset code request rate limit hit for {}...", &email_key[..8]);
        return Ok(Json(generic));
    }

    let conn = state.db.get()?;
    match queries::get_principal_by_email(&conn, &body.email)? {
        Some(principal) => {
            let _code =
                queries::issue_reset_code(&conn, &principal.id, state.auth.otp_ttl_secs)?;
            tracing::info!(principal = %principal.id, "password reset code issued");
        }
        None => {
            tracing::debug!("reset code requested for unknown email");
        }
    }

    Ok(Json(generic))
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub reset: bool,
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>> {
    body.validate()?;
    let conn = state.db.get()?;

    let principal = queries::get_principal_by_email(&conn, &body.email)?
        .ok_or_else(|| AppError::BadRequest(msg::RESET_NOT_REQUESTED.into()))?;

    let Some(ref stored) = principal.reset_code_hash else {
        return Err(AppError::BadRequest(msg::RESET_NOT_REQUESTED.into()));
    };
    if principal
        .reset_expires_at
        .is_none_or(|exp| Utc::now().timestamp() > exp)
    {
        return Err(AppError::BadRequest(msg::RESET_EXPIRED.into()));
    }
    if !crypto::fingerprint_matches(&body.code, stored) {
        return Err(AppError::BadRequest(msg::RESET_MISMATCH.into()));
    }

    queries::apply_password_reset(&conn, &principal.id, &crypto::hash_password(&body.new_password)?)?;

    Ok(Json(ResetPasswordResponse { reset: true }))
}

#[derive(Debug, Serialize)]
pub struct GuestResponse {
    /// The ephemeral subject baked into the tokens. Not a credentials row.
    pub principal_id: String,
    pub tokens: TokenBundle,
}

/// POST /auth/guest
///
/// Issues a stateless guest bundle. No Credential Store interaction - the
/// identity exists only inside the signed tokens.
pub async fn guest_session(State(state): State<AppState>) -> Result<Json<GuestResponse>> {
    let (principal_id, tokens) = state.issuer.issue_guest()?;
    Ok(Json(GuestResponse {
        principal_id,
        tokens,
    }))
}
