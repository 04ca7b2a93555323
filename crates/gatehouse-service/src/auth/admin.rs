//! Scope lookups, session listing and bulk revocation.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_auth::ScopeResolution;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::RevocationReason;
use gatehouse_entity::session::Session;

use super::ops;
use super::service::AuthService;
use crate::interceptor::OperationContext;

impl AuthService {
    /// Effective scopes of `user_id` in the given organization/project.
    pub async fn get_user_scopes(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> AppResult<ScopeResolution> {
        let ctx = OperationContext::new(ops::GET_USER_SCOPES).with_actor(user_id);
        self.interceptors
            .run(ctx, self.scopes.resolve(user_id, organization_id, project_id))
            .await
    }

    /// End every session of `user_id` and invalidate every token issued so
    /// far. Returns the number of sessions revoked.
    pub async fn revoke_all_user_tokens(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
    ) -> AppResult<u64> {
        let ctx = OperationContext::new(ops::REVOKE_ALL_USER_TOKENS)
            .with_metadata("user_id", user_id.to_string())
            .with_metadata("reason", reason.as_str());
        self.interceptors
            .run(ctx, async {
                self.revocations
                    .blacklist_all_user_tokens(user_id, reason)
                    .await?;
                let revoked = self.sessions.revoke_all(user_id, reason).await?;
                info!(user_id = %user_id, revoked, reason = %reason, "User tokens revoked");
                Ok(revoked)
            })
            .await
    }

    /// Active sessions of `user_id`, newest first.
    pub async fn list_sessions(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let ctx = OperationContext::new(ops::LIST_SESSIONS).with_actor(user_id);
        self.interceptors
            .run(ctx, self.sessions.list_active(user_id))
            .await
    }

    /// Revoke one session of `user_id` together with its live access token.
    pub async fn revoke_session(&self, user_id: Uuid, session_id: Uuid) -> AppResult<()> {
        let ctx = OperationContext::new(ops::REVOKE_SESSION)
            .with_actor(user_id)
            .with_metadata("session_id", session_id.to_string());
        self.interceptors
            .run(ctx, async {
                let session = self.sessions.get(session_id).await?;
                if session.user_id != user_id {
                    return Err(AppError::not_found("Session not found"));
                }

                self.sessions
                    .revoke(session.id, RevocationReason::SessionRevoked)
                    .await?;
                if session.access_expires_at > Utc::now() {
                    if let Err(e) = self
                        .revocations
                        .blacklist(
                            session.current_jti,
                            user_id,
                            session.access_expires_at,
                            RevocationReason::SessionRevoked,
                        )
                        .await
                    {
                        warn!(session_id = %session.id, error = %e, "Failed to blacklist session token");
                    }
                }
                Ok(())
            })
            .await
    }
}
