//! Key-pair entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A long-lived machine credential scoped to one project.
///
/// The public key is stored in clear and indexed; the secret is stored only
/// as an argon2 hash. Deleting a key pair deactivates it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KeyPair {
    /// Unique key-pair identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Organization the project belongs to.
    pub organization_id: Uuid,
    /// Project embedded in the public key.
    pub project_id: Uuid,
    /// Human-readable label.
    pub name: String,
    /// `pk_<project>_<random>`.
    pub public_key: String,
    /// Argon2 hash of the secret key.
    #[serde(skip_serializing)]
    pub secret_hash: String,
    /// Granted scopes (`resource:action`).
    pub scopes: Vec<String>,
    /// Requests per minute; stored for the external limiter.
    pub rate_limit_per_minute: i32,
    /// Optional hard expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// `false` once revoked.
    pub is_active: bool,
    /// Last successful validation.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the key pair was created.
    pub created_at: DateTime<Utc>,
    /// When the key pair was last updated.
    pub updated_at: DateTime<Utc>,
}

impl KeyPair {
    /// Whether the key pair passed its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Whether the key pair may authenticate.
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.is_expired()
    }
}

/// Data required to persist a key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeyPair {
    /// Owning user.
    pub user_id: Uuid,
    /// Organization.
    pub organization_id: Uuid,
    /// Project.
    pub project_id: Uuid,
    /// Label.
    pub name: String,
    /// Public key in clear.
    pub public_key: String,
    /// Argon2 hash of the secret.
    pub secret_hash: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Requests per minute.
    pub rate_limit_per_minute: i32,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateKeyPair {
    /// Materialize the row the store will persist.
    pub fn into_key_pair(self, id: Uuid, now: DateTime<Utc>) -> KeyPair {
        KeyPair {
            id,
            user_id: self.user_id,
            organization_id: self.organization_id,
            project_id: self.project_id,
            name: self.name,
            public_key: self.public_key,
            secret_hash: self.secret_hash,
            scopes: self.scopes,
            rate_limit_per_minute: self.rate_limit_per_minute,
            expires_at: self.expires_at,
            is_active: true,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for the mutable key-pair fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyPairChanges {
    /// New label.
    pub name: Option<String>,
    /// Replacement scope list.
    pub scopes: Option<Vec<String>>,
    /// New rate limit.
    pub rate_limit_per_minute: Option<i32>,
}

impl KeyPairChanges {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.scopes.is_none() && self.rate_limit_per_minute.is_none()
    }

    /// Apply the changes to an in-memory row.
    pub fn apply_to(&self, key_pair: &mut KeyPair, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            key_pair.name = name.clone();
        }
        if let Some(scopes) = &self.scopes {
            key_pair.scopes = scopes.clone();
        }
        if let Some(limit) = self.rate_limit_per_minute {
            key_pair.rate_limit_per_minute = limit;
        }
        key_pair.updated_at = now;
    }
}

/// A freshly issued key pair. The only value that ever carries the secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedKeyPair {
    /// Stored record.
    pub key_pair: KeyPair,
    /// Raw secret key; not recoverable later.
    pub secret_key: String,
}
