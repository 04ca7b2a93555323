//! Blacklist and user-cutoff rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::reason::RevocationReason;

/// A single revoked token.
///
/// Kept until the token's natural expiry; after that the signature check
/// alone rejects it and the entry is pruned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlacklistEntry {
    /// Revoked token identifier.
    pub jti: Uuid,
    /// Owner of the token.
    pub user_id: Uuid,
    /// Natural expiry of the revoked token.
    pub expires_at: DateTime<Utc>,
    /// Why the token was revoked.
    pub reason: RevocationReason,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// Whether the revoked token would have expired anyway.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// "Every token of this user issued at or before `revoked_before` is invalid."
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRevocation {
    /// Affected user.
    pub user_id: Uuid,
    /// Issued-at cutoff.
    pub revoked_before: DateTime<Utc>,
    /// Why the cutoff was recorded.
    pub reason: RevocationReason,
    /// When the cutoff was last moved.
    pub created_at: DateTime<Utc>,
}

impl UserRevocation {
    /// Cutoff in Unix milliseconds.
    pub fn cutoff_millis(&self) -> i64 {
        self.revoked_before.timestamp_millis()
    }

    /// Whether a token issued at `issued_at_ms` (Unix milliseconds) is
    /// revoked. Inclusive: a token minted in the cutoff millisecond is
    /// revoked.
    pub fn revokes(&self, issued_at_ms: i64) -> bool {
        issued_at_ms <= self.cutoff_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cutoff_is_inclusive_at_millisecond_precision() {
        let cutoff = Utc::now();
        let revocation = UserRevocation {
            user_id: Uuid::new_v4(),
            revoked_before: cutoff,
            reason: RevocationReason::PasswordChange,
            created_at: cutoff,
        };

        let ms = cutoff.timestamp_millis();
        assert!(revocation.revokes(ms));
        assert!(revocation.revokes((cutoff - Duration::seconds(30)).timestamp_millis()));
        assert!(!revocation.revokes(ms + 1));
    }
}
