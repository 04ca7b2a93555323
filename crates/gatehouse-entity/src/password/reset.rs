//! Password reset token row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single-use password reset token.
///
/// Only the SHA-256 digest is stored. A newer request for the same user
/// supersedes every older unused token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordResetToken {
    /// Unique identifier.
    pub id: Uuid,
    /// User the reset applies to.
    pub user_id: Uuid,
    /// SHA-256 hex digest of the raw token.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// When the token was consumed or superseded.
    pub used_at: Option<DateTime<Utc>>,
    /// When the token was created.
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Whether the token can still be redeemed.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}
