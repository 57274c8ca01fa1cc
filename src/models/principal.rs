use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};
use crate::models::DeviceContext;

/// Basic email format validation.
///
/// Validates that email has exactly one @, a non-empty local part, and a
/// domain with at least one dot. Intentionally permissive - this is a sanity
/// check, not RFC 5322 compliance.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let local_part = parts[0];
    let domain_part = parts[1];

    if local_part.is_empty() || local_part.contains(' ') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty()
        || !domain_part.contains('.')
        || domain_part.starts_with('.')
        || domain_part.ends_with('.')
    {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccountStatus::Pending),
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            _ => Err(()),
        }
    }
}

/// Role-shaped profile data, stored as a single JSON value on the principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Profile {
    User {
        #[serde(skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        avatar_url: Option<String>,
    },
    Publisher {
        #[serde(skip_serializing_if = "Option::is_none")]
        outlet: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bio: Option<String>,
    },
    Admin,
}

/// An authenticable identity backed by a credentials row.
///
/// Guests are principals too, but ephemeral ones - they never appear in
/// this table and exist only inside their signed tokens.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(skip_serializing)]
    pub otp_code_hash: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<i64>,
    pub otp_verified_at: Option<i64>,
    #[serde(skip_serializing)]
    pub reset_code_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_expires_at: Option<i64>,
    /// Fingerprint of the single currently-valid refresh token.
    /// Overwritten on every issue, cleared on logout.
    #[serde(skip_serializing)]
    pub refresh_fingerprint: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Principal {
    /// A registration verification code is still outstanding on the account.
    pub fn otp_pending(&self) -> bool {
        self.status == AccountStatus::Pending && self.otp_code_hash.is_some()
    }
}

/// Insert parameters for a new principal row. The password is already
/// hashed by the time it reaches the store.
#[derive(Debug)]
pub struct CreatePrincipal {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub profile: Option<Profile>,
    /// Per-call override of the process-wide OTP gate.
    pub require_otp: Option<bool>,
    pub device: Option<DeviceContext>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        if self.password.len() < 8 {
            return Err(AppError::BadRequest(msg::PASSWORD_TOO_SHORT.into()));
        }
        if let Some(ref device) = self.device {
            device.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device: Option<DeviceContext>,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if let Some(ref device) = self.device {
            device.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.new_password.len() < 8 {
            return Err(AppError::BadRequest(msg::PASSWORD_TOO_SHORT.into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Test Reader".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            phone: None,
            role: None,
            profile: None,
            require_otp: None,
            device: None,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(register("a@x.com", "password1").validate().is_ok());
        assert!(register("a@sub.x.com", "password1").validate().is_ok());
        assert!(register("", "password1").validate().is_err());
        assert!(register("no-at-sign", "password1").validate().is_err());
        assert!(register("a@@x.com", "password1").validate().is_err());
        assert!(register("a@x", "password1").validate().is_err());
        assert!(register("a@.x.com", "password1").validate().is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(register("a@x.com", "short").validate().is_err());
        assert!(register("a@x.com", "12345678").validate().is_ok());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::User, Role::Publisher, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("guest".parse::<Role>().is_err());
    }
}
