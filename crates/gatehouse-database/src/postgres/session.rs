//! Session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::RevocationReason;
use gatehouse_entity::session::{CreateSession, Session, SessionRotation};

use crate::error::db_error;
use crate::repository::SessionRepository;

/// PostgreSQL-backed [`SessionRepository`].
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, data: CreateSession) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, current_jti, \
             access_expires_at, refresh_expires_at, device_name, ip_address, user_agent, \
             last_used_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(data.user_id)
        .bind(&data.refresh_token_hash)
        .bind(data.current_jti)
        .bind(data.access_expires_at)
        .bind(data.refresh_expires_at)
        .bind(&data.device.device_name)
        .bind(&data.device.ip_address)
        .bind(&data.device.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create session"))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find session"))
    }

    async fn find_by_refresh_token_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE refresh_token_hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find session by refresh token"))
    }

    async fn find_by_current_jti(&self, jti: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE current_jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find session by token id"))
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 AND is_active \
             AND refresh_expires_at > NOW() ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to find active sessions"))
    }

    async fn rotate_if_unchanged(&self, rotation: &SessionRotation) -> AppResult<Option<Session>> {
        let (new_hash, new_refresh_expiry) = match &rotation.refresh {
            Some(refresh) => (
                Some(refresh.refresh_token_hash.as_str()),
                Some(refresh.refresh_expires_at),
            ),
            None => (None, None),
        };

        sqlx::query_as::<_, Session>(
            "UPDATE sessions SET current_jti = $4, access_expires_at = $5, \
             refresh_token_hash = COALESCE($6, refresh_token_hash), \
             refresh_expires_at = COALESCE($7, refresh_expires_at), \
             updated_at = NOW(), last_used_at = NOW() \
             WHERE id = $1 AND refresh_token_hash = $2 AND current_jti = $3 AND is_active \
             RETURNING *",
        )
        .bind(rotation.session_id)
        .bind(&rotation.expected_hash)
        .bind(rotation.expected_jti)
        .bind(rotation.new_jti)
        .bind(rotation.access_expires_at)
        .bind(new_hash)
        .bind(new_refresh_expiry)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to rotate session"))
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to touch session"))?;
        Ok(())
    }

    async fn revoke(&self, id: Uuid, reason: RevocationReason) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE, revoked_at = NOW(), revoke_reason = $2, \
             updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to revoke session"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, reason: RevocationReason) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE, revoked_at = NOW(), revoke_reason = $2, \
             updated_at = NOW() WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to revoke user sessions"))?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE access_expires_at <= $1 AND refresh_expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to delete expired sessions"))?;
        Ok(result.rows_affected())
    }
}
