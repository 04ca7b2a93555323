//! User entity model.
//!
//! Users are owned by the surrounding user-management subsystem; the auth
//! core reads them and only writes password hashes, last-login stamps, and
//! first-time OAuth accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How an account proves its identity. Each account has exactly one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Email and password.
    Password,
    /// An external OAuth provider.
    OAuth,
}

impl AuthMethod {
    /// Return the method as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::OAuth => "oauth",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Email address, stored lowercase.
    pub email: String,
    /// Argon2 password hash; `None` for OAuth accounts.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Login method.
    pub auth_method: AuthMethod,
    /// OAuth provider name (`google`, `github`, ...).
    pub oauth_provider: Option<String>,
    /// Subject identifier at the OAuth provider.
    pub oauth_provider_id: Option<String>,
    /// Organization placed in access tokens when none is selected.
    pub default_organization_id: Option<Uuid>,
    /// Whether the account may authenticate.
    pub is_active: bool,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this account logs in with a password.
    pub fn uses_password(&self) -> bool {
        self.auth_method == AuthMethod::Password
    }

    /// Display name assembled from the stored name parts.
    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (normalized by the caller).
    pub email: String,
    /// Pre-hashed password for password accounts.
    pub password_hash: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Login method.
    pub auth_method: AuthMethod,
    /// OAuth provider name.
    pub oauth_provider: Option<String>,
    /// Subject identifier at the OAuth provider.
    pub oauth_provider_id: Option<String>,
}

impl CreateUser {
    /// Materialize the row the store will persist.
    pub fn into_user(self, id: Uuid, now: DateTime<Utc>) -> User {
        User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            auth_method: self.auth_method,
            oauth_provider: self.oauth_provider,
            oauth_provider_id: self.oauth_provider_id,
            default_organization_id: None,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
