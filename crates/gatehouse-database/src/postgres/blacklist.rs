//! Token blacklist and user cutoff repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::{BlacklistEntry, UserRevocation};

use crate::error::db_error;
use crate::repository::BlacklistRepository;

/// PostgreSQL-backed [`BlacklistRepository`].
#[derive(Debug, Clone)]
pub struct PgBlacklistRepository {
    pool: PgPool,
}

impl PgBlacklistRepository {
    /// Create a new blacklist repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistRepository for PgBlacklistRepository {
    async fn insert(&self, entry: BlacklistEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO token_blacklist (jti, user_id, expires_at, reason, created_at) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(entry.jti)
        .bind(entry.user_id)
        .bind(entry.expires_at)
        .bind(entry.reason)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to blacklist token"))?;
        Ok(())
    }

    async fn find(&self, jti: Uuid) -> AppResult<Option<BlacklistEntry>> {
        sqlx::query_as::<_, BlacklistEntry>("SELECT * FROM token_blacklist WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to look up blacklisted token"))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to prune blacklist"))?;
        Ok(result.rows_affected())
    }

    async fn upsert_user_revocation(
        &self,
        revocation: UserRevocation,
    ) -> AppResult<UserRevocation> {
        sqlx::query_as::<_, UserRevocation>(
            "INSERT INTO user_token_revocations (user_id, revoked_before, reason, created_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
             revoked_before = GREATEST(user_token_revocations.revoked_before, EXCLUDED.revoked_before), \
             reason = EXCLUDED.reason, created_at = EXCLUDED.created_at \
             RETURNING *",
        )
        .bind(revocation.user_id)
        .bind(revocation.revoked_before)
        .bind(revocation.reason)
        .bind(revocation.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to record user revocation"))
    }

    async fn find_user_revocation(&self, user_id: Uuid) -> AppResult<Option<UserRevocation>> {
        sqlx::query_as::<_, UserRevocation>(
            "SELECT * FROM user_token_revocations WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to look up user revocation"))
    }

    async fn delete_user_revocations_before(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM user_token_revocations WHERE revoked_before < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to prune user revocations"))?;
        Ok(result.rows_affected())
    }
}
