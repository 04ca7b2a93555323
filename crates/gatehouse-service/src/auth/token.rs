//! Refresh, logout and bearer token validation.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use gatehouse_auth::digest::sha256_hex;
use gatehouse_auth::jwt::Claims;
use gatehouse_auth::{TokenError, TokenType};
use gatehouse_core::cancel::guarded;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::RevocationReason;
use gatehouse_entity::session::{RefreshRotation, TokenPair};

use super::ops;
use super::service::AuthService;
use crate::context::AuthContext;
use crate::interceptor::OperationContext;

const TOKEN_REVOKED: &str = "Token has been revoked";
const INVALID_REFRESH: &str = "Invalid refresh token";

impl AuthService {
    /// Exchange a refresh token for a new access token, and a new refresh
    /// token when rotation is enabled.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        self.interceptors
            .run(OperationContext::new(ops::REFRESH), self.refresh_inner(refresh_token))
            .await
    }

    async fn refresh_inner(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.engine.verify_refresh(refresh_token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AppError::unauthorized(INVALID_REFRESH))?;

        if self.revocations.is_blacklisted(claims.jti).await? {
            return Err(AppError::unauthorized(TOKEN_REVOKED));
        }
        if self
            .revocations
            .is_user_revoked_after(user_id, claims.issued_at_millis())
            .await?
        {
            return Err(AppError::unauthorized(TOKEN_REVOKED));
        }

        let session = self
            .sessions
            .get_by_refresh_token_hash(&sha256_hex(refresh_token))
            .await
            .map_err(|e| match e.kind {
                ErrorKind::NotFound => AppError::unauthorized(INVALID_REFRESH),
                _ => e,
            })?;
        self.sessions.require_usable(&session)?;
        if session.user_id != user_id {
            warn!(session_id = %session.id, "Refresh token subject does not own the session");
            return Err(AppError::unauthorized(INVALID_REFRESH));
        }

        let user = self.active_user(user_id).await?;

        let access = self
            .engine
            .issue_access_token(user.id, Self::access_claims(&user))?;
        let new_refresh = if self.rotate_refresh_tokens {
            Some(self.engine.issue_refresh_token(user.id)?)
        } else {
            None
        };
        let rotation = new_refresh.as_ref().map(|issued| RefreshRotation {
            refresh_token_hash: sha256_hex(&issued.token),
            refresh_expires_at: issued.expires_at,
        });

        let rotated = self
            .sessions
            .rotate(&session, access.jti, access.expires_at, rotation)
            .await?;

        // One live access token per session: retire the one being replaced.
        if session.access_expires_at > Utc::now() {
            self.retire(
                session.current_jti,
                user.id,
                session.access_expires_at,
                RevocationReason::TokenRotation,
            )
            .await;
        }
        if new_refresh.is_some() {
            self.retire(
                claims.jti,
                user.id,
                claims.expires_at(),
                RevocationReason::TokenRotation,
            )
            .await;
        }

        info!(
            user_id = %user.id,
            session_id = %rotated.id,
            rotated_refresh = new_refresh.is_some(),
            "Token refreshed"
        );

        let refresh_token = match new_refresh {
            Some(issued) => issued.token,
            None => refresh_token.to_string(),
        };
        Ok(TokenPair::bearer(
            access.token,
            refresh_token,
            self.engine.access_ttl_seconds(),
        ))
    }

    /// Blacklist a token whose replacement is already live. The session row
    /// no longer references it, so a failure here is logged only.
    async fn retire(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: chrono::DateTime<Utc>,
        reason: RevocationReason,
    ) {
        if let Err(e) = self
            .revocations
            .blacklist(jti, user_id, expires_at, reason)
            .await
        {
            warn!(jti = %jti, error = %e, "Failed to blacklist replaced token");
        }
    }

    /// Revoke the access token `jti` of `user_id` and the session it belongs
    /// to. Logging out twice is not an error.
    pub async fn logout(&self, jti: Uuid, user_id: Uuid) -> AppResult<()> {
        let ctx = OperationContext::new(ops::LOGOUT).with_actor(user_id);
        self.interceptors
            .run(ctx, self.logout_inner(jti, user_id))
            .await
    }

    async fn logout_inner(&self, jti: Uuid, user_id: Uuid) -> AppResult<()> {
        let session = self.sessions.find_by_current_jti(jti).await?;

        let expires_at = match &session {
            Some(session) if session.user_id != user_id => {
                warn!(jti = %jti, user_id = %user_id, "Logout for a token of another user ignored");
                return Ok(());
            }
            Some(session) => session.access_expires_at,
            None => {
                Utc::now()
                    + chrono::Duration::seconds(
                        i64::try_from(self.engine.access_ttl_seconds()).unwrap_or(i64::MAX),
                    )
            }
        };

        self.revocations
            .blacklist(jti, user_id, expires_at, RevocationReason::UserLogout)
            .await?;

        if let Some(session) = session {
            self.sessions
                .revoke(session.id, RevocationReason::UserLogout)
                .await?;
        }

        info!(user_id = %user_id, jti = %jti, "Logout completed");
        Ok(())
    }

    /// Validate a bearer token presented on a request.
    pub async fn validate_token(&self, token: &str) -> AppResult<AuthContext> {
        self.interceptors
            .run_identified(
                OperationContext::new(ops::VALIDATE_TOKEN),
                self.validate_inner(token, None),
                |ctx| Some(ctx.user_id),
            )
            .await
    }

    /// [`validate_token`](Self::validate_token) that gives up with
    /// `ErrorKind::Cancelled` once `cancel` fires. Validation is read-only,
    /// so an aborted call leaves nothing behind.
    pub async fn validate_token_with(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> AppResult<AuthContext> {
        self.interceptors
            .run_identified(
                OperationContext::new(ops::VALIDATE_TOKEN),
                self.validate_inner(token, Some(cancel)),
                |ctx| Some(ctx.user_id),
            )
            .await
    }

    async fn validate_inner(
        &self,
        token: &str,
        cancel: Option<&CancellationToken>,
    ) -> AppResult<AuthContext> {
        let guard = self.guard(cancel);
        let claims = self.engine.verify(token)?;

        if guarded(&guard, "blacklist lookup", self.revocations.is_blacklisted(claims.jti)).await? {
            debug!(jti = %claims.jti, "Rejected blacklisted token");
            return Err(AppError::unauthorized(TOKEN_REVOKED));
        }

        match claims.token_type() {
            TokenType::Access => self.validate_access(&claims, &guard).await,
            TokenType::ApiKey => self.validate_api_key(&claims, &guard).await,
            TokenType::Refresh => Err(TokenError::WrongType {
                expected: TokenType::Access,
                actual: TokenType::Refresh,
            }
            .into()),
        }
    }

    async fn validate_access(
        &self,
        claims: &Claims,
        guard: &gatehouse_core::cancel::CallGuard,
    ) -> AppResult<AuthContext> {
        let user_id = claims
            .user_id()
            .ok_or_else(|| AppError::unauthorized("Invalid access token"))?;
        let revoked = guarded(
            guard,
            "user cutoff lookup",
            self.revocations.is_user_revoked_after(user_id, claims.issued_at_millis()),
        )
        .await?;
        if revoked {
            return Err(AppError::unauthorized(TOKEN_REVOKED));
        }
        Ok(AuthContext::for_user(user_id, claims))
    }

    async fn validate_api_key(
        &self,
        claims: &Claims,
        guard: &gatehouse_core::cancel::CallGuard,
    ) -> AppResult<AuthContext> {
        let key_id = claims
            .api_key()
            .map(|p| p.key_id)
            .ok_or_else(|| AppError::unauthorized("Invalid API key token"))?;
        let key_pair = guarded(guard, "key pair lookup", self.key_pairs.get(key_id))
            .await
            .map_err(|e| match e.kind {
                ErrorKind::NotFound => AppError::unauthorized("Invalid API key token"),
                _ => e,
            })?;
        if !key_pair.is_usable() {
            return Err(AppError::unauthorized("API key has been revoked"));
        }

        guarded(guard, "key owner lookup", self.active_user(key_pair.user_id)).await?;
        let revoked = guarded(
            guard,
            "user cutoff lookup",
            self.revocations
                .is_user_revoked_after(key_pair.user_id, claims.issued_at_millis()),
        )
        .await?;
        if revoked {
            return Err(AppError::unauthorized(TOKEN_REVOKED));
        }
        Ok(AuthContext::for_key_pair(&key_pair, claims))
    }
}
