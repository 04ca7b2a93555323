//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::revocation::RevocationReason;

/// Server-side record of one login.
///
/// A session binds the hash of the single valid refresh token to the JTI of
/// the most recently issued access token. Revocation flips `is_active` and
/// keeps the row; only the expiry sweep deletes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// SHA-256 hex digest of the current refresh token.
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,
    /// JTI of the most recently issued access token.
    pub current_jti: Uuid,
    /// Expiry of the current access token.
    pub access_expires_at: DateTime<Utc>,
    /// Expiry of the current refresh token.
    pub refresh_expires_at: DateTime<Utc>,
    /// `false` once revoked.
    pub is_active: bool,
    /// Client-supplied device name.
    pub device_name: Option<String>,
    /// Client IP address at login.
    pub ip_address: Option<String>,
    /// User-Agent at login.
    pub user_agent: Option<String>,
    /// When the session was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Why the session was revoked.
    pub revoke_reason: Option<RevocationReason>,
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// When the session row last changed.
    pub updated_at: DateTime<Utc>,
    /// Last time the session was used to refresh or authenticate.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the refresh token bound to this session has expired.
    pub fn is_refresh_expired(&self) -> bool {
        self.refresh_expires_at <= Utc::now()
    }

    /// Whether the session may still be refreshed.
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.is_refresh_expired()
    }

    /// Whether both tokens have expired and the row can be deleted.
    pub fn is_fully_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_expires_at <= now && self.refresh_expires_at <= now
    }
}

/// Client metadata captured at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Client-supplied device name.
    pub device_name: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// User-Agent header.
    pub user_agent: Option<String>,
}

/// Data required to create a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// SHA-256 hex digest of the refresh token.
    pub refresh_token_hash: String,
    /// JTI of the access token issued alongside.
    pub current_jti: Uuid,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiry.
    pub refresh_expires_at: DateTime<Utc>,
    /// Client metadata.
    pub device: DeviceInfo,
}

impl CreateSession {
    /// Materialize the row the store will persist.
    pub fn into_session(self, id: Uuid, now: DateTime<Utc>) -> Session {
        Session {
            id,
            user_id: self.user_id,
            refresh_token_hash: self.refresh_token_hash,
            current_jti: self.current_jti,
            access_expires_at: self.access_expires_at,
            refresh_expires_at: self.refresh_expires_at,
            is_active: true,
            device_name: self.device.device_name,
            ip_address: self.device.ip_address,
            user_agent: self.device.user_agent,
            revoked_at: None,
            revoke_reason: None,
            created_at: now,
            updated_at: now,
            last_used_at: Some(now),
        }
    }
}

/// Replacement refresh token installed by a rotating refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRotation {
    /// SHA-256 hex digest of the new refresh token.
    pub refresh_token_hash: String,
    /// Expiry of the new refresh token.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Compare-and-swap update applied on refresh.
///
/// The store applies it only if the row still carries `expected_hash` and
/// `expected_jti`; otherwise another refresh won the race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRotation {
    /// Session being rotated.
    pub session_id: Uuid,
    /// Refresh hash read before minting.
    pub expected_hash: String,
    /// Access JTI read before minting.
    pub expected_jti: Uuid,
    /// JTI of the newly minted access token.
    pub new_jti: Uuid,
    /// Expiry of the newly minted access token.
    pub access_expires_at: DateTime<Utc>,
    /// New refresh token, when rotation is enabled.
    pub refresh: Option<RefreshRotation>,
}

impl SessionRotation {
    /// Apply the rotation to an in-memory row.
    pub fn apply_to(&self, session: &mut Session, now: DateTime<Utc>) {
        session.current_jti = self.new_jti;
        session.access_expires_at = self.access_expires_at;
        if let Some(refresh) = &self.refresh {
            session.refresh_token_hash = refresh.refresh_token_hash.clone();
            session.refresh_expires_at = refresh.refresh_expires_at;
        }
        session.updated_at = now;
        session.last_used_at = Some(now);
    }

    /// Whether the row still matches the state this rotation was computed from.
    pub fn matches(&self, session: &Session) -> bool {
        session.is_active
            && session.refresh_token_hash == self.expected_hash
            && session.current_jti == self.expected_jti
    }
}
