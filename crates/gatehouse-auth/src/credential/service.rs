//! Key-pair issuance, validation and management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use gatehouse_core::config::CredentialConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::KeyPairRepository;
use gatehouse_entity::credential::{CreateKeyPair, IssuedKeyPair, KeyPair, KeyPairChanges};

use crate::password::PasswordHasher;

use super::dispatcher::LastUsedDispatcher;
use super::format::KeyFormat;
use super::generator::KeyGenerator;

/// Message for every key-pair authentication failure.
const INVALID_KEY_PAIR: &str = "Invalid API key";

/// Request to issue a key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueKeyPair {
    /// Owning user.
    pub user_id: Uuid,
    /// Organization of the project.
    pub organization_id: Uuid,
    /// Project the key is scoped to.
    pub project_id: Uuid,
    /// Label.
    pub name: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Requests per minute; configuration default when `None`.
    pub rate_limit_per_minute: Option<i32>,
    /// Optional hard expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Issues and validates key pairs.
#[derive(Clone)]
pub struct KeyPairService {
    repo: Arc<dyn KeyPairRepository>,
    hasher: PasswordHasher,
    format: KeyFormat,
    generator: KeyGenerator,
    dispatcher: LastUsedDispatcher,
    universal_scope: String,
    default_rate_limit: i32,
}

impl std::fmt::Debug for KeyPairService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairService")
            .field("format", &self.format)
            .field("universal_scope", &self.universal_scope)
            .finish_non_exhaustive()
    }
}

impl KeyPairService {
    /// Create the service. `dispatcher` receives last-used touches.
    pub fn new(
        repo: Arc<dyn KeyPairRepository>,
        config: &CredentialConfig,
        dispatcher: LastUsedDispatcher,
    ) -> AppResult<Self> {
        let format = KeyFormat::new(config);
        Ok(Self {
            repo,
            hasher: PasswordHasher::for_secrets(config)?,
            generator: KeyGenerator::new(format.clone()),
            format,
            dispatcher,
            universal_scope: config.universal_scope.clone(),
            default_rate_limit: config.default_rate_limit_per_minute,
        })
    }

    /// Key layout used by this service.
    pub fn format(&self) -> &KeyFormat {
        &self.format
    }

    /// Issue a key pair. The returned secret is never retrievable again.
    pub async fn issue(&self, request: IssueKeyPair) -> AppResult<IssuedKeyPair> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Key pair name must not be empty"));
        }
        self.validate_scopes(&request.scopes)?;
        let rate_limit = request
            .rate_limit_per_minute
            .unwrap_or(self.default_rate_limit);
        validate_rate_limit(rate_limit)?;
        if request.expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(AppError::validation("Expiry must be in the future"));
        }

        let public_key = self.generator.public_key(request.project_id);
        let secret_key = self.generator.secret_key();
        let secret_hash = self.hasher.hash_async(&secret_key).await?;

        let key_pair = self
            .repo
            .create(CreateKeyPair {
                user_id: request.user_id,
                organization_id: request.organization_id,
                project_id: request.project_id,
                name: name.to_string(),
                public_key,
                secret_hash,
                scopes: dedup(request.scopes),
                rate_limit_per_minute: rate_limit,
                expires_at: request.expires_at,
            })
            .await?;

        info!(
            key_pair_id = %key_pair.id,
            project_id = %key_pair.project_id,
            public_key = %key_pair.public_key,
            "Key pair issued"
        );

        Ok(IssuedKeyPair {
            key_pair,
            secret_key,
        })
    }

    /// Authenticate a public/secret pair. Every failure is the same
    /// `Unauthorized`.
    pub async fn validate(&self, public_key: &str, secret_key: &str) -> AppResult<KeyPair> {
        if let Err(e) = self.format.parse_public_key(public_key) {
            debug!(error = %e, "Rejected malformed public key");
            return Err(AppError::unauthorized(INVALID_KEY_PAIR));
        }
        if let Err(e) = self.format.validate_secret_format(secret_key) {
            debug!(error = %e, "Rejected malformed secret key");
            return Err(AppError::unauthorized(INVALID_KEY_PAIR));
        }

        let Some(key_pair) = self.repo.find_by_public_key(public_key).await? else {
            self.hasher.dummy_verify_async(secret_key).await;
            return Err(AppError::unauthorized(INVALID_KEY_PAIR));
        };

        if !self.hasher.verify_async(secret_key, &key_pair.secret_hash).await? {
            warn!(key_pair_id = %key_pair.id, "Key pair secret mismatch");
            return Err(AppError::unauthorized(INVALID_KEY_PAIR));
        }

        if !key_pair.is_usable() {
            debug!(
                key_pair_id = %key_pair.id,
                active = key_pair.is_active,
                "Key pair is inactive or expired"
            );
            return Err(AppError::unauthorized(INVALID_KEY_PAIR));
        }

        self.dispatcher.touch(key_pair.id);
        Ok(key_pair)
    }

    /// Whether `key_pair` grants `required`.
    pub fn has_scope(&self, key_pair: &KeyPair, required: &str) -> bool {
        key_pair
            .scopes
            .iter()
            .any(|s| *s == self.universal_scope || s == required)
    }

    /// Require every scope in `required`; `Forbidden` names the first missing one.
    pub fn check_scopes(&self, key_pair: &KeyPair, required: &[&str]) -> AppResult<()> {
        match required.iter().find(|r| !self.has_scope(key_pair, r)) {
            Some(missing) => Err(AppError::forbidden(format!("Missing scope: {missing}"))),
            None => Ok(()),
        }
    }

    /// Fetch a key pair.
    pub async fn get(&self, id: Uuid) -> AppResult<KeyPair> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Key pair {id} not found")))
    }

    /// Key pairs of a project, newest first.
    pub async fn list_for_project(&self, project_id: Uuid) -> AppResult<Vec<KeyPair>> {
        self.repo.find_by_project(project_id).await
    }

    /// Change the label.
    pub async fn rename(&self, id: Uuid, name: &str) -> AppResult<KeyPair> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Key pair name must not be empty"));
        }
        self.repo
            .update(
                id,
                &KeyPairChanges {
                    name: Some(name.to_string()),
                    ..KeyPairChanges::default()
                },
            )
            .await
    }

    /// Replace the scope list.
    pub async fn update_scopes(&self, id: Uuid, scopes: Vec<String>) -> AppResult<KeyPair> {
        self.validate_scopes(&scopes)?;
        let key_pair = self
            .repo
            .update(
                id,
                &KeyPairChanges {
                    scopes: Some(dedup(scopes)),
                    ..KeyPairChanges::default()
                },
            )
            .await?;
        info!(key_pair_id = %id, scopes = ?key_pair.scopes, "Key pair scopes updated");
        Ok(key_pair)
    }

    /// Change the stored rate limit.
    pub async fn update_rate_limit(&self, id: Uuid, per_minute: i32) -> AppResult<KeyPair> {
        validate_rate_limit(per_minute)?;
        self.repo
            .update(
                id,
                &KeyPairChanges {
                    rate_limit_per_minute: Some(per_minute),
                    ..KeyPairChanges::default()
                },
            )
            .await
    }

    /// Deactivate a key pair. Returns `false` if it was already inactive.
    pub async fn deactivate(&self, id: Uuid) -> AppResult<bool> {
        let changed = self.repo.deactivate(id).await?;
        if changed {
            info!(key_pair_id = %id, "Key pair deactivated");
        }
        Ok(changed)
    }

    /// Check scope syntax: `resource:action` in lowercase `[a-z0-9_-]`, or
    /// the universal scope.
    pub fn validate_scopes(&self, scopes: &[String]) -> AppResult<()> {
        for scope in scopes {
            if *scope == self.universal_scope {
                continue;
            }
            let valid = scope.split_once(':').is_some_and(|(resource, action)| {
                is_scope_segment(resource) && is_scope_segment(action)
            });
            if !valid {
                return Err(AppError::validation(format!(
                    "Invalid scope '{scope}': expected resource:action"
                )));
            }
        }
        Ok(())
    }
}

fn is_scope_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'))
}

fn validate_rate_limit(per_minute: i32) -> AppResult<()> {
    if per_minute <= 0 {
        return Err(AppError::validation("Rate limit must be positive"));
    }
    Ok(())
}

fn dedup(scopes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(scopes.len());
    for scope in scopes {
        if !out.contains(&scope) {
            out.push(scope);
        }
    }
    out
}
