//! Session manager: create, rotate, revoke and sweep login sessions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::SessionRepository;
use gatehouse_entity::revocation::RevocationReason;
use gatehouse_entity::session::{
    CreateSession, DeviceInfo, RefreshRotation, Session, SessionRotation,
};

/// Manages session rows. Holds no token material beyond refresh-token hashes.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a new session manager over the given repository.
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// Persist a new active session.
    pub async fn create(
        &self,
        user_id: Uuid,
        refresh_token_hash: String,
        jti: Uuid,
        access_expires_at: DateTime<Utc>,
        refresh_expires_at: DateTime<Utc>,
        device: DeviceInfo,
    ) -> AppResult<Session> {
        let session = self
            .sessions
            .create(CreateSession {
                user_id,
                refresh_token_hash,
                current_jti: jti,
                access_expires_at,
                refresh_expires_at,
                device,
            })
            .await?;

        info!(
            user_id = %user_id,
            session_id = %session.id,
            device = session.device_name.as_deref().unwrap_or("-"),
            "Session created"
        );
        Ok(session)
    }

    /// Look up a session by refresh-token hash.
    pub async fn get_by_refresh_token_hash(&self, hash: &str) -> AppResult<Session> {
        self.sessions
            .find_by_refresh_token_hash(hash)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))
    }

    /// Look up the session whose current access token carries `jti`.
    pub async fn find_by_current_jti(&self, jti: Uuid) -> AppResult<Option<Session>> {
        self.sessions.find_by_current_jti(jti).await
    }

    /// Look up a session by ID.
    pub async fn get(&self, session_id: Uuid) -> AppResult<Session> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))
    }

    /// Reject sessions that can no longer be refreshed.
    pub fn require_usable(&self, session: &Session) -> AppResult<()> {
        if !session.is_active {
            return Err(AppError::unauthorized("Session has been revoked"));
        }
        if session.is_refresh_expired() {
            return Err(AppError::unauthorized("Session has expired"));
        }
        Ok(())
    }

    /// Swap in a new access JTI (and refresh hash when `refresh` is set).
    ///
    /// Applied only if the row still holds the hash and JTI read from
    /// `session`; losing that race is `Unauthorized`.
    pub async fn rotate(
        &self,
        session: &Session,
        new_jti: Uuid,
        access_expires_at: DateTime<Utc>,
        refresh: Option<RefreshRotation>,
    ) -> AppResult<Session> {
        let rotation = SessionRotation {
            session_id: session.id,
            expected_hash: session.refresh_token_hash.clone(),
            expected_jti: session.current_jti,
            new_jti,
            access_expires_at,
            refresh,
        };

        match self.sessions.rotate_if_unchanged(&rotation).await? {
            Some(updated) => {
                debug!(
                    session_id = %session.id,
                    rotated_refresh = rotation.refresh.is_some(),
                    "Session rotated"
                );
                Ok(updated)
            }
            None => {
                warn!(session_id = %session.id, "Concurrent refresh lost the race");
                Err(AppError::unauthorized("Refresh token has already been used"))
            }
        }
    }

    /// Revoke one session. Returns `false` if it was already inactive.
    pub async fn revoke(&self, session_id: Uuid, reason: RevocationReason) -> AppResult<bool> {
        let changed = self.sessions.revoke(session_id, reason).await?;
        if changed {
            info!(session_id = %session_id, reason = %reason, "Session revoked");
        }
        Ok(changed)
    }

    /// Revoke every active session of a user.
    pub async fn revoke_all(&self, user_id: Uuid, reason: RevocationReason) -> AppResult<u64> {
        let count = self.sessions.revoke_all_for_user(user_id, reason).await?;
        info!(user_id = %user_id, count, reason = %reason, "Revoked all sessions");
        Ok(count)
    }

    /// Stamp the session as used. Failures are logged only.
    pub async fn mark_used(&self, session: &Session) {
        if let Err(e) = self.sessions.touch(session.id, Utc::now()).await {
            warn!(session_id = %session.id, error = %e, "Failed to mark session used");
        }
    }

    /// Active sessions of a user, newest first.
    pub async fn list_active(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.sessions.find_active_by_user(user_id).await
    }

    /// Delete sessions whose access and refresh tokens have both expired.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let removed = self.sessions.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Expired sessions removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gatehouse_core::error::ErrorKind;
    use gatehouse_database::memory::MemorySessionRepository;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemorySessionRepository::default()))
    }

    async fn login(manager: &SessionManager, user_id: Uuid, hash: &str) -> Session {
        let now = Utc::now();
        manager
            .create(
                user_id,
                hash.to_string(),
                Uuid::now_v7(),
                now + Duration::minutes(15),
                now + Duration::days(7),
                DeviceInfo {
                    device_name: Some("laptop".into()),
                    ..DeviceInfo::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup_by_hash() {
        let manager = manager();
        let user_id = Uuid::now_v7();
        let session = login(&manager, user_id, "h1").await;

        let found = manager.get_by_refresh_token_hash("h1").await.unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.device_name.as_deref(), Some("laptop"));

        let missing = manager.get_by_refresh_token_hash("nope").await.unwrap_err();
        assert_eq!(missing.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rotation_replaces_hash_once() {
        let manager = manager();
        let session = login(&manager, Uuid::now_v7(), "old").await;
        let new_jti = Uuid::now_v7();

        let rotated = manager
            .rotate(
                &session,
                new_jti,
                Utc::now() + Duration::minutes(15),
                Some(RefreshRotation {
                    refresh_token_hash: "new".into(),
                    refresh_expires_at: Utc::now() + Duration::days(7),
                }),
            )
            .await
            .unwrap();
        assert_eq!(rotated.current_jti, new_jti);
        assert_eq!(rotated.refresh_token_hash, "new");
        assert!(manager.get_by_refresh_token_hash("old").await.is_err());

        // A second rotation computed from the stale row loses.
        let err = manager
            .rotate(&session, Uuid::now_v7(), Utc::now(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_revoked_session_is_not_usable() {
        let manager = manager();
        let session = login(&manager, Uuid::now_v7(), "h").await;
        assert!(manager.require_usable(&session).is_ok());

        assert!(
            manager
                .revoke(session.id, RevocationReason::UserLogout)
                .await
                .unwrap()
        );
        assert!(
            !manager
                .revoke(session.id, RevocationReason::UserLogout)
                .await
                .unwrap()
        );

        let revoked = manager.get(session.id).await.unwrap();
        assert_eq!(revoked.revoke_reason, Some(RevocationReason::UserLogout));
        assert_eq!(
            manager.require_usable(&revoked).unwrap_err().kind,
            ErrorKind::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_revoke_all_and_list() {
        let manager = manager();
        let user_id = Uuid::now_v7();
        login(&manager, user_id, "a").await;
        login(&manager, user_id, "b").await;
        login(&manager, Uuid::now_v7(), "c").await;

        assert_eq!(manager.list_active(user_id).await.unwrap().len(), 2);
        assert_eq!(
            manager
                .revoke_all(user_id, RevocationReason::PasswordChange)
                .await
                .unwrap(),
            2
        );
        assert!(manager.list_active(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_expired_keeps_live_sessions() {
        let manager = manager();
        let user_id = Uuid::now_v7();
        let past = Utc::now() - Duration::minutes(1);
        manager
            .create(user_id, "dead".into(), Uuid::now_v7(), past, past, DeviceInfo::default())
            .await
            .unwrap();
        login(&manager, user_id, "live").await;

        assert_eq!(manager.cleanup_expired().await.unwrap(), 1);
        assert!(manager.get_by_refresh_token_hash("live").await.is_ok());
    }
}
