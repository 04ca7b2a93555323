//! Revocation registry backed by the blacklist repository with an optional
//! read cache in front.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use gatehouse_cache::CacheManager;
use gatehouse_cache::keys;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::cache::CacheProvider;
use gatehouse_database::BlacklistRepository;
use gatehouse_entity::revocation::{BlacklistEntry, RevocationReason, UserRevocation};

/// Denylist of individual tokens plus "everything issued before T" cutoffs.
///
/// The two mechanisms are independent; a token is revoked if either applies.
/// Cache errors never fail a check: they fall through to the repository.
#[derive(Clone)]
pub struct RevocationRegistry {
    repo: Arc<dyn BlacklistRepository>,
    cache: Option<CacheManager>,
    cutoff_cache_ttl: Duration,
}

impl std::fmt::Debug for RevocationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationRegistry")
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl RevocationRegistry {
    /// Registry reading straight from the repository.
    pub fn new(repo: Arc<dyn BlacklistRepository>) -> Self {
        Self {
            repo,
            cache: None,
            cutoff_cache_ttl: Duration::ZERO,
        }
    }

    /// Cache positive JTI hits and user cutoffs. Cutoffs are cached for
    /// `cutoff_ttl`, normally the refresh-token lifetime.
    pub fn with_cache(mut self, cache: CacheManager, cutoff_ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cutoff_cache_ttl = cutoff_ttl;
        self
    }

    /// Blacklist a JTI until the token's natural expiry. Idempotent.
    pub async fn blacklist(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> AppResult<()> {
        let now = Utc::now();
        self.repo
            .insert(BlacklistEntry {
                jti,
                user_id,
                expires_at,
                reason,
                created_at: now,
            })
            .await?;

        debug!(jti = %jti, user_id = %user_id, reason = %reason, "Token blacklisted");

        if let Ok(remaining) = (expires_at - now).to_std() {
            self.cache_put(&keys::revoked_jti(jti), reason.as_str(), remaining)
                .await;
        }
        Ok(())
    }

    /// Whether a JTI is blacklisted and not yet pruned.
    pub async fn is_blacklisted(&self, jti: Uuid) -> AppResult<bool> {
        let key = keys::revoked_jti(jti);
        if self.cache_get(&key).await.is_some() {
            return Ok(true);
        }

        let Some(entry) = self.repo.find(jti).await? else {
            return Ok(false);
        };
        let now = Utc::now();
        if entry.is_expired(now) {
            return Ok(false);
        }
        if let Ok(remaining) = (entry.expires_at - now).to_std() {
            self.cache_put(&key, entry.reason.as_str(), remaining).await;
        }
        Ok(true)
    }

    /// Invalidate every token of `user_id` issued up to now.
    ///
    /// Returns only once the clock has moved past the cutoff millisecond, so
    /// a token minted after this call is never caught by the cutoff.
    pub async fn blacklist_all_user_tokens(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
    ) -> AppResult<UserRevocation> {
        let now = Utc::now();
        let stored = self
            .repo
            .upsert_user_revocation(UserRevocation {
                user_id,
                revoked_before: now,
                reason,
                created_at: now,
            })
            .await?;

        info!(
            user_id = %user_id,
            reason = %reason,
            cutoff = %stored.revoked_before,
            "All user tokens revoked"
        );

        self.cache_put(
            &keys::user_cutoff(user_id),
            &stored.cutoff_millis().to_string(),
            self.cutoff_cache_ttl,
        )
        .await;

        let wait = u64::try_from(now.timestamp_millis() + 1 - Utc::now().timestamp_millis())
            .unwrap_or(0);
        if wait > 0 {
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        Ok(stored)
    }

    /// Whether a token of `user_id` issued at `issued_at_ms` (Unix
    /// milliseconds) falls at or before the user's cutoff.
    pub async fn is_user_revoked_after(
        &self,
        user_id: Uuid,
        issued_at_ms: i64,
    ) -> AppResult<bool> {
        let key = keys::user_cutoff(user_id);
        if let Some(cutoff) = self
            .cache_get(&key)
            .await
            .and_then(|v| v.parse::<i64>().ok())
        {
            return Ok(issued_at_ms <= cutoff);
        }

        let Some(revocation) = self.repo.find_user_revocation(user_id).await? else {
            return Ok(false);
        };
        self.cache_put(
            &key,
            &revocation.cutoff_millis().to_string(),
            self.cutoff_cache_ttl,
        )
        .await;
        Ok(revocation.revokes(issued_at_ms))
    }

    /// Prune blacklist entries whose tokens have expired.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let removed = self.repo.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Expired blacklist entries removed");
        }
        Ok(removed)
    }

    /// Prune user cutoffs recorded before `before`.
    pub async fn cleanup_older_than(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let removed = self.repo.delete_user_revocations_before(before).await?;
        if removed > 0 {
            info!(removed, before = %before, "Stale user cutoffs removed");
        }
        Ok(removed)
    }

    async fn cache_get(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Revocation cache read failed");
                None
            }
        }
    }

    async fn cache_put(&self, key: &str, value: &str, ttl: Duration) {
        let Some(cache) = &self.cache else {
            return;
        };
        if ttl.is_zero() {
            return;
        }
        if let Err(e) = cache.set(key, value, ttl).await {
            warn!(key, error = %e, "Revocation cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use gatehouse_core::error::AppError;
    use gatehouse_database::memory::MemoryBlacklistRepository;

    fn registry() -> RevocationRegistry {
        RevocationRegistry::new(Arc::new(MemoryBlacklistRepository::default()))
            .with_cache(CacheManager::in_memory(), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_blacklist_is_idempotent() {
        let registry = registry();
        let jti = Uuid::now_v7();
        let user = Uuid::now_v7();
        let exp = Utc::now() + ChronoDuration::minutes(10);

        assert!(!registry.is_blacklisted(jti).await.unwrap());
        registry
            .blacklist(jti, user, exp, RevocationReason::UserLogout)
            .await
            .unwrap();
        registry
            .blacklist(jti, user, exp, RevocationReason::UserLogout)
            .await
            .unwrap();
        assert!(registry.is_blacklisted(jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_uncached_registry_reads_repository() {
        let repo = Arc::new(MemoryBlacklistRepository::default());
        let writer = RevocationRegistry::new(repo.clone());
        let reader = RevocationRegistry::new(repo);
        let jti = Uuid::now_v7();

        writer
            .blacklist(
                jti,
                Uuid::now_v7(),
                Utc::now() + ChronoDuration::minutes(5),
                RevocationReason::AdminRevocation,
            )
            .await
            .unwrap();
        assert!(reader.is_blacklisted(jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_cutoff_is_inclusive() {
        let registry = registry();
        let user = Uuid::now_v7();
        let issued_before = Utc::now().timestamp_millis() - 10;

        assert!(!registry.is_user_revoked_after(user, issued_before).await.unwrap());

        let cutoff = registry
            .blacklist_all_user_tokens(user, RevocationReason::PasswordChange)
            .await
            .unwrap()
            .cutoff_millis();

        assert!(registry.is_user_revoked_after(user, issued_before).await.unwrap());
        assert!(registry.is_user_revoked_after(user, cutoff).await.unwrap());
        assert!(!registry.is_user_revoked_after(user, cutoff + 1).await.unwrap());
        assert!(!registry.is_user_revoked_after(Uuid::now_v7(), cutoff).await.unwrap());
    }

    #[tokio::test]
    async fn test_cutoff_returns_after_its_millisecond() {
        let registry = registry();
        let user = Uuid::now_v7();

        let cutoff = registry
            .blacklist_all_user_tokens(user, RevocationReason::AdminRevocation)
            .await
            .unwrap()
            .cutoff_millis();

        let minted = Utc::now().timestamp_millis();
        assert!(minted > cutoff);
        assert!(!registry.is_user_revoked_after(user, minted).await.unwrap());
    }

    #[tokio::test]
    async fn test_uncached_cutoff_uses_milliseconds() {
        let registry = RevocationRegistry::new(Arc::new(MemoryBlacklistRepository::default()));
        let user = Uuid::now_v7();

        let cutoff = registry
            .blacklist_all_user_tokens(user, RevocationReason::PasswordChange)
            .await
            .unwrap()
            .cutoff_millis();

        assert!(registry.is_user_revoked_after(user, cutoff).await.unwrap());
        assert!(!registry.is_user_revoked_after(user, cutoff + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup() {
        let registry = registry();
        registry
            .blacklist(
                Uuid::now_v7(),
                Uuid::now_v7(),
                Utc::now() - ChronoDuration::seconds(1),
                RevocationReason::TokenRotation,
            )
            .await
            .unwrap();
        assert_eq!(registry.cleanup_expired().await.unwrap(), 1);

        registry
            .blacklist_all_user_tokens(Uuid::now_v7(), RevocationReason::Compliance)
            .await
            .unwrap();
        let later = Utc::now() + ChronoDuration::seconds(5);
        assert_eq!(registry.cleanup_older_than(later).await.unwrap(), 1);
    }

    #[derive(Debug)]
    struct BrokenCache;

    #[async_trait]
    impl CacheProvider for BrokenCache {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::cache("down"))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
            Err(AppError::cache("down"))
        }
        async fn delete(&self, _key: &str) -> AppResult<()> {
            Err(AppError::cache("down"))
        }
        async fn exists(&self, _key: &str) -> AppResult<bool> {
            Err(AppError::cache("down"))
        }
        async fn take(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::cache("down"))
        }
        async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<bool> {
            Err(AppError::cache("down"))
        }
        async fn health_check(&self) -> AppResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_cache_failure_degrades_to_repository() {
        let registry = RevocationRegistry::new(Arc::new(MemoryBlacklistRepository::default()))
            .with_cache(
                CacheManager::from_provider(Arc::new(BrokenCache)),
                Duration::from_secs(60),
            );
        let jti = Uuid::now_v7();
        let user = Uuid::now_v7();

        registry
            .blacklist(
                jti,
                user,
                Utc::now() + ChronoDuration::minutes(1),
                RevocationReason::UserLogout,
            )
            .await
            .unwrap();
        assert!(registry.is_blacklisted(jti).await.unwrap());

        registry
            .blacklist_all_user_tokens(user, RevocationReason::Compliance)
            .await
            .unwrap();
        assert!(
            registry
                .is_user_revoked_after(user, Utc::now().timestamp_millis() - 5_000)
                .await
                .unwrap()
        );
    }
}
