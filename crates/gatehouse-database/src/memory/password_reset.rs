//! In-memory password reset token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::password::PasswordResetToken;

use crate::repository::PasswordResetRepository;

/// `DashMap`-backed [`PasswordResetRepository`].
#[derive(Debug, Default)]
pub struct MemoryPasswordResetRepository {
    tokens: DashMap<Uuid, PasswordResetToken>,
}

#[async_trait]
impl PasswordResetRepository for MemoryPasswordResetRepository {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<PasswordResetToken> {
        if self.tokens.iter().any(|t| t.token_hash == token_hash) {
            return Err(AppError::conflict("Password reset token already exists"));
        }
        let token = PasswordResetToken {
            id: Uuid::now_v7(),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            used_at: None,
            created_at: Utc::now(),
        };
        self.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<PasswordResetToken>> {
        Ok(self
            .tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.clone()))
    }

    async fn mark_used(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tokens.get_mut(&id).is_some_and(|mut t| {
            if t.used_at.is_some() {
                return false;
            }
            t.used_at = Some(Utc::now());
            true
        }))
    }

    async fn invalidate_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let now = Utc::now();
        let mut count = 0;
        for mut token in self.tokens.iter_mut() {
            if token.user_id == user_id && token.used_at.is_none() {
                token.used_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| t.expires_at > now);
        Ok((before - self.tokens.len()) as u64)
    }
}
