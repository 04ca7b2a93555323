//! Maintenance sweeps over the credential store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use gatehouse_auth::{RevocationRegistry, SessionManager};
use gatehouse_core::config::SessionConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::{CredentialStore, PasswordResetRepository};

/// Runs the periodic cleanup work. Each sweep is idempotent and safe to run
/// concurrently with request traffic.
#[derive(Clone)]
pub struct MaintenanceTasks {
    sessions: SessionManager,
    revocations: RevocationRegistry,
    password_resets: Arc<dyn PasswordResetRepository>,
    cutoff_retention: Duration,
}

impl std::fmt::Debug for MaintenanceTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceTasks")
            .field("cutoff_retention", &self.cutoff_retention)
            .finish_non_exhaustive()
    }
}

impl MaintenanceTasks {
    /// Build the sweeps over `store`.
    pub fn new(store: &CredentialStore, config: &SessionConfig) -> AppResult<Self> {
        let hours = i64::try_from(config.revocation_cutoff_retention_hours)
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| {
                AppError::configuration(
                    "session.revocation_cutoff_retention_hours must be a positive number of hours",
                )
            })?;

        Ok(Self {
            sessions: SessionManager::new(Arc::clone(&store.sessions)),
            revocations: RevocationRegistry::new(Arc::clone(&store.blacklist)),
            password_resets: Arc::clone(&store.password_resets),
            cutoff_retention: Duration::hours(hours),
        })
    }

    /// Delete sessions whose access and refresh tokens have both expired.
    pub async fn sweep_sessions(&self) -> AppResult<u64> {
        info!("Running session sweep");
        self.sessions.cleanup_expired().await
    }

    /// Drop expired blacklist entries, then user cutoffs older than the
    /// retention window. Returns the total number of rows removed.
    pub async fn sweep_revocations(&self) -> AppResult<u64> {
        info!("Running revocation sweep");
        let entries = self.revocations.cleanup_expired().await?;
        let cutoffs = self
            .revocations
            .cleanup_older_than(Utc::now() - self.cutoff_retention)
            .await?;
        Ok(entries + cutoffs)
    }

    /// Delete password-reset tokens past their expiry.
    pub async fn sweep_reset_tokens(&self) -> AppResult<u64> {
        info!("Running reset token sweep");
        let removed = self.password_resets.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Expired reset tokens removed");
        }
        Ok(removed)
    }

    /// Run every sweep once. A failing sweep does not stop the others; the
    /// first error is returned after all have run.
    pub async fn run_all(&self) -> AppResult<u64> {
        let results = [
            self.sweep_sessions().await,
            self.sweep_revocations().await,
            self.sweep_reset_tokens().await,
        ];

        let mut removed = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(n) => removed += n,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::error::ErrorKind;
    use gatehouse_entity::revocation::{BlacklistEntry, RevocationReason, UserRevocation};
    use gatehouse_entity::session::{CreateSession, DeviceInfo};
    use uuid::Uuid;

    fn session(user_id: Uuid, expires_in: Duration) -> CreateSession {
        let at = Utc::now() + expires_in;
        CreateSession {
            user_id,
            refresh_token_hash: Uuid::new_v4().simple().to_string(),
            current_jti: Uuid::new_v4(),
            access_expires_at: at,
            refresh_expires_at: at,
            device: DeviceInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_session_sweep_keeps_live_sessions() {
        let store = CredentialStore::in_memory();
        let tasks = MaintenanceTasks::new(&store, &SessionConfig::default()).unwrap();
        let user = Uuid::now_v7();

        store.sessions.create(session(user, Duration::hours(-1))).await.unwrap();
        let live = store.sessions.create(session(user, Duration::hours(1))).await.unwrap();

        assert_eq!(tasks.sweep_sessions().await.unwrap(), 1);
        assert!(store.sessions.find_by_id(live.id).await.unwrap().is_some());
        assert_eq!(tasks.sweep_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_revocation_sweep_honours_retention() {
        let store = CredentialStore::in_memory();
        let config = SessionConfig {
            revocation_cutoff_retention_hours: 24,
            ..SessionConfig::default()
        };
        let tasks = MaintenanceTasks::new(&store, &config).unwrap();
        let now = Utc::now();

        let stale = BlacklistEntry {
            jti: Uuid::new_v4(),
            user_id: Uuid::now_v7(),
            expires_at: now - Duration::minutes(5),
            reason: RevocationReason::UserLogout,
            created_at: now - Duration::minutes(20),
        };
        let live = BlacklistEntry {
            jti: Uuid::new_v4(),
            expires_at: now + Duration::minutes(5),
            ..stale.clone()
        };
        store.blacklist.insert(stale.clone()).await.unwrap();
        store.blacklist.insert(live.clone()).await.unwrap();

        let old_user = Uuid::now_v7();
        let recent_user = Uuid::now_v7();
        for (user_id, age) in [(old_user, Duration::hours(30)), (recent_user, Duration::hours(2))] {
            store
                .blacklist
                .upsert_user_revocation(UserRevocation {
                    user_id,
                    revoked_before: now - age,
                    reason: RevocationReason::AdminRevocation,
                    created_at: now - age,
                })
                .await
                .unwrap();
        }

        assert_eq!(tasks.sweep_revocations().await.unwrap(), 2);
        assert!(store.blacklist.find(stale.jti).await.unwrap().is_none());
        assert!(store.blacklist.find(live.jti).await.unwrap().is_some());
        assert!(store.blacklist.find_user_revocation(old_user).await.unwrap().is_none());
        assert!(store.blacklist.find_user_revocation(recent_user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_all_sweeps_reset_tokens() {
        let store = CredentialStore::in_memory();
        let tasks = MaintenanceTasks::new(&store, &SessionConfig::default()).unwrap();
        let user = Uuid::now_v7();

        store
            .password_resets
            .create(user, "expired", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        let fresh = store
            .password_resets
            .create(user, "fresh", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(tasks.run_all().await.unwrap(), 1);
        let kept = store.password_resets.find_by_hash("fresh").await.unwrap().unwrap();
        assert_eq!(kept.id, fresh.id);
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        let config = SessionConfig {
            revocation_cutoff_retention_hours: 0,
            ..SessionConfig::default()
        };
        let err = MaintenanceTasks::new(&CredentialStore::in_memory(), &config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
