//! Request and response types of the auth orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::credential::IssuedKeyPair;
use gatehouse_entity::session::{Session, TokenPair};
use gatehouse_entity::user::User;

/// Registration of a password account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address.
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    /// Password; strength is checked against the password policy.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Given name.
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    /// Family name.
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

/// Email and password login.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Password change by an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Current password.
    #[validate(length(min = 1))]
    pub current_password: String,
    /// New password.
    #[validate(length(min = 1))]
    pub new_password: String,
}

/// Password reset with a token delivered out of band.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    /// Raw reset token.
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    /// New password.
    #[validate(length(min = 1))]
    pub new_password: String,
}

/// Key-pair creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateKeyPairRequest {
    /// Organization of the project.
    pub organization_id: Uuid,
    /// Project the key is scoped to.
    pub project_id: Uuid,
    /// Label.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Requests per minute; configuration default when absent.
    #[validate(range(min = 1))]
    pub rate_limit_per_minute: Option<i32>,
    /// Optional hard expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Normalized identity returned by an OAuth provider exchange.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OAuthProfile {
    /// Verified email address.
    #[validate(email)]
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Provider name (`google`, `github`, ...).
    #[validate(length(min = 1))]
    pub provider: String,
    /// Subject identifier at the provider.
    #[validate(length(min = 1))]
    pub provider_id: String,
}

/// Result of a successful login, registration or token generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    /// Token pair handed to the client.
    pub tokens: TokenPair,
    /// Session created for the login.
    pub session: Session,
    /// The authenticated user.
    pub user: User,
}

/// A newly created key pair. The secret appears here and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairCreated {
    /// Key-pair ID.
    pub id: Uuid,
    /// Label.
    pub name: String,
    /// Public key.
    pub public_key: String,
    /// Secret key, shown once.
    pub secret_key: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Requests per minute.
    pub rate_limit_per_minute: i32,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<IssuedKeyPair> for KeyPairCreated {
    fn from(issued: IssuedKeyPair) -> Self {
        let key_pair = issued.key_pair;
        Self {
            id: key_pair.id,
            name: key_pair.name,
            public_key: key_pair.public_key,
            secret_key: issued.secret_key,
            scopes: key_pair.scopes,
            rate_limit_per_minute: key_pair.rate_limit_per_minute,
            expires_at: key_pair.expires_at,
            created_at: key_pair.created_at,
        }
    }
}

/// Short-lived bearer token minted from a key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyToken {
    /// The signed API-key token.
    pub access_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    /// Scopes carried by the token.
    pub scopes: Vec<String>,
}

/// Run derive validation and map failures to `ErrorKind::Validation`.
pub(crate) fn validate_request<T: Validate>(request: &T) -> AppResult<()> {
    request
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}

/// Emails are compared case-insensitively and stored lowercase.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::error::ErrorKind;

    #[test]
    fn test_register_requires_valid_email() {
        let request = RegisterRequest {
            email: "not-an-email".into(),
            password: "x".into(),
            first_name: None,
            last_name: None,
        };
        let err = validate_request(&request).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_key_pair_request_rejects_zero_rate_limit() {
        let request = CreateKeyPairRequest {
            organization_id: Uuid::now_v7(),
            project_id: Uuid::now_v7(),
            name: "ci".into(),
            scopes: vec![],
            rate_limit_per_minute: Some(0),
            expires_at: None,
        };
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@B.com "), "a@b.com");
    }
}
