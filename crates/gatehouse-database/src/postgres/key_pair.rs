//! Key-pair repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::credential::{CreateKeyPair, KeyPair, KeyPairChanges};

use crate::error::db_error;
use crate::repository::KeyPairRepository;

/// PostgreSQL-backed [`KeyPairRepository`].
#[derive(Debug, Clone)]
pub struct PgKeyPairRepository {
    pool: PgPool,
}

impl PgKeyPairRepository {
    /// Create a new key-pair repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyPairRepository for PgKeyPairRepository {
    async fn create(&self, data: CreateKeyPair) -> AppResult<KeyPair> {
        sqlx::query_as::<_, KeyPair>(
            "INSERT INTO key_pairs (id, user_id, organization_id, project_id, name, public_key, \
             secret_hash, scopes, rate_limit_per_minute, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(data.user_id)
        .bind(data.organization_id)
        .bind(data.project_id)
        .bind(&data.name)
        .bind(&data.public_key)
        .bind(&data.secret_hash)
        .bind(&data.scopes)
        .bind(data.rate_limit_per_minute)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create key pair"))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<KeyPair>> {
        sqlx::query_as::<_, KeyPair>("SELECT * FROM key_pairs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find key pair"))
    }

    async fn find_by_public_key(&self, public_key: &str) -> AppResult<Option<KeyPair>> {
        sqlx::query_as::<_, KeyPair>("SELECT * FROM key_pairs WHERE public_key = $1")
            .bind(public_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find key pair by public key"))
    }

    async fn find_by_project(&self, project_id: Uuid) -> AppResult<Vec<KeyPair>> {
        sqlx::query_as::<_, KeyPair>(
            "SELECT * FROM key_pairs WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list key pairs"))
    }

    async fn update(&self, id: Uuid, changes: &KeyPairChanges) -> AppResult<KeyPair> {
        sqlx::query_as::<_, KeyPair>(
            "UPDATE key_pairs SET name = COALESCE($2, name), scopes = COALESCE($3, scopes), \
             rate_limit_per_minute = COALESCE($4, rate_limit_per_minute), updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.scopes)
        .bind(changes.rate_limit_per_minute)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update key pair"))?
        .ok_or_else(|| AppError::not_found(format!("Key pair {id} not found")))
    }

    async fn deactivate(&self, id: Uuid) -> AppResult<bool> {
        let previous: Option<bool> = sqlx::query_scalar(
            "WITH previous AS (SELECT is_active FROM key_pairs WHERE id = $1) \
             UPDATE key_pairs SET is_active = FALSE, updated_at = NOW() WHERE id = $1 \
             RETURNING (SELECT is_active FROM previous)",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate key pair"))?;

        previous.ok_or_else(|| AppError::not_found(format!("Key pair {id} not found")))
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE key_pairs SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update key pair last use"))?;
        Ok(())
    }
}
