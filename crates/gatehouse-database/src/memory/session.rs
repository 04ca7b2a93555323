//! In-memory session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::RevocationReason;
use gatehouse_entity::session::{CreateSession, Session, SessionRotation};

use crate::repository::SessionRepository;

/// `DashMap`-backed [`SessionRepository`].
///
/// `rotate_if_unchanged` holds the entry's shard lock while comparing and
/// writing, which gives the same linearization as the conditional UPDATE.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<Uuid, Session>,
}

fn revoke_in_place(session: &mut Session, reason: RevocationReason, now: DateTime<Utc>) -> bool {
    if !session.is_active {
        return false;
    }
    session.is_active = false;
    session.revoked_at = Some(now);
    session.revoke_reason = Some(reason);
    session.updated_at = now;
    true
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, data: CreateSession) -> AppResult<Session> {
        let id = Uuid::now_v7();
        let session = data.into_session(id, Utc::now());
        self.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn find_by_refresh_token_hash(&self, hash: &str) -> AppResult<Option<Session>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.refresh_token_hash == hash)
            .map(|s| s.clone()))
    }

    async fn find_by_current_jti(&self, jti: Uuid) -> AppResult<Option<Session>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.current_jti == jti)
            .map(|s| s.clone()))
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_usable())
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn rotate_if_unchanged(&self, rotation: &SessionRotation) -> AppResult<Option<Session>> {
        let Some(mut session) = self.sessions.get_mut(&rotation.session_id) else {
            return Ok(None);
        };
        if !rotation.matches(&session) {
            return Ok(None);
        }
        rotation.apply_to(&mut session, Utc::now());
        Ok(Some(session.clone()))
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn revoke(&self, id: Uuid, reason: RevocationReason) -> AppResult<bool> {
        Ok(self
            .sessions
            .get_mut(&id)
            .is_some_and(|mut s| revoke_in_place(&mut s, reason, Utc::now())))
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, reason: RevocationReason) -> AppResult<u64> {
        let now = Utc::now();
        let mut count = 0;
        for mut session in self.sessions.iter_mut() {
            if session.user_id == user_id && revoke_in_place(&mut session, reason, now) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_fully_expired(now));
        Ok((before - self.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gatehouse_entity::session::{DeviceInfo, RefreshRotation};

    fn new_session(user_id: Uuid, hash: &str, ttl: Duration) -> CreateSession {
        let now = Utc::now();
        CreateSession {
            user_id,
            refresh_token_hash: hash.to_string(),
            current_jti: Uuid::now_v7(),
            access_expires_at: now + ttl,
            refresh_expires_at: now + ttl,
            device: DeviceInfo::default(),
        }
    }

    fn rotation_for(session: &Session, new_hash: Option<&str>) -> SessionRotation {
        SessionRotation {
            session_id: session.id,
            expected_hash: session.refresh_token_hash.clone(),
            expected_jti: session.current_jti,
            new_jti: Uuid::now_v7(),
            access_expires_at: Utc::now() + Duration::minutes(15),
            refresh: new_hash.map(|h| RefreshRotation {
                refresh_token_hash: h.to_string(),
                refresh_expires_at: Utc::now() + Duration::days(7),
            }),
        }
    }

    #[tokio::test]
    async fn test_second_rotation_from_same_snapshot_loses() {
        let repo = MemorySessionRepository::default();
        let session = repo
            .create(new_session(Uuid::new_v4(), "h1", Duration::hours(1)))
            .await
            .expect("create");

        let first = rotation_for(&session, Some("h2"));
        let second = rotation_for(&session, Some("h3"));

        let rotated = repo.rotate_if_unchanged(&first).await.expect("rotate");
        assert_eq!(rotated.map(|s| s.refresh_token_hash), Some("h2".to_string()));
        assert!(repo.rotate_if_unchanged(&second).await.expect("rotate").is_none());
        assert!(repo.find_by_refresh_token_hash("h1").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn test_rotation_without_refresh_keeps_hash() {
        let repo = MemorySessionRepository::default();
        let session = repo
            .create(new_session(Uuid::new_v4(), "h1", Duration::hours(1)))
            .await
            .expect("create");

        let rotation = rotation_for(&session, None);
        let rotated = repo
            .rotate_if_unchanged(&rotation)
            .await
            .expect("rotate")
            .expect("should win");
        assert_eq!(rotated.refresh_token_hash, "h1");
        assert_eq!(rotated.current_jti, rotation.new_jti);
    }

    #[tokio::test]
    async fn test_revoke_all_and_cleanup() {
        let repo = MemorySessionRepository::default();
        let user = Uuid::new_v4();
        repo.create(new_session(user, "a", Duration::hours(1))).await.expect("create");
        repo.create(new_session(user, "b", Duration::hours(1))).await.expect("create");
        repo.create(new_session(user, "c", Duration::seconds(-5))).await.expect("create");

        assert_eq!(
            repo.revoke_all_for_user(user, RevocationReason::PasswordChange)
                .await
                .expect("revoke"),
            3
        );
        assert!(repo.find_active_by_user(user).await.expect("list").is_empty());
        assert_eq!(repo.delete_expired(Utc::now()).await.expect("cleanup"), 1);
    }
}
