//! OAuth session exchange.
//!
//! The provider round trip happens outside the core. `begin_oauth` issues a
//! CSRF state, `complete_oauth` consumes it together with the provider's
//! normalized profile and parks the minted tokens under a one-time handoff
//! code, and `redeem_oauth_handoff` hands them to the client exactly once.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_auth::digest::random_hex;
use gatehouse_cache::keys;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::CacheProvider;
use gatehouse_entity::session::{DeviceInfo, TokenPair};
use gatehouse_entity::user::{AuthMethod, CreateUser, User};

use super::ops;
use super::service::AuthService;
use crate::dto::{OAuthProfile, normalize_email, validate_request};
use crate::interceptor::OperationContext;

/// Random bytes in a state value or handoff code.
const CODE_BYTES: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct PendingState {
    provider: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Handoff {
    session_id: Uuid,
    tokens: TokenPair,
}

impl AuthService {
    /// Issue a CSRF state for a login with `provider`.
    pub async fn begin_oauth(&self, provider: &str) -> AppResult<String> {
        self.interceptors
            .run(
                OperationContext::new(ops::BEGIN_OAUTH).with_metadata("provider", provider),
                self.begin_oauth_inner(provider),
            )
            .await
    }

    async fn begin_oauth_inner(&self, provider: &str) -> AppResult<String> {
        let provider = provider.trim().to_lowercase();
        if provider.is_empty() {
            return Err(AppError::validation("OAuth provider is required"));
        }
        if !self.oauth.allowed_providers.is_empty()
            && !self.oauth.allowed_providers.iter().any(|p| *p == provider)
        {
            return Err(AppError::validation(format!(
                "Unsupported OAuth provider '{provider}'"
            )));
        }

        let state = random_hex(CODE_BYTES);
        self.cache
            .set_json(
                &keys::oauth_state(&state),
                &PendingState {
                    provider,
                    created_at: Utc::now(),
                },
                Duration::from_secs(self.oauth.state_ttl_seconds),
            )
            .await?;
        Ok(state)
    }

    /// Consume `state`, find or create the user behind `profile`, mint
    /// tokens and return the one-time code that releases them.
    pub async fn complete_oauth(
        &self,
        state: &str,
        provider: &str,
        profile: OAuthProfile,
        device: DeviceInfo,
    ) -> AppResult<String> {
        let ctx = OperationContext::new(ops::COMPLETE_OAUTH)
            .with_metadata("provider", provider)
            .with_optional("ip_address", device.ip_address.as_deref());
        self.interceptors
            .run(ctx, self.complete_oauth_inner(state, provider, profile, device))
            .await
    }

    async fn complete_oauth_inner(
        &self,
        state: &str,
        provider: &str,
        profile: OAuthProfile,
        device: DeviceInfo,
    ) -> AppResult<String> {
        let provider = provider.trim().to_lowercase();
        let pending: PendingState = self
            .cache
            .take_json(&keys::oauth_state(state))
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired OAuth state"))?;
        if pending.provider != provider || profile.provider.to_lowercase() != provider {
            warn!(expected = %pending.provider, got = %provider, "OAuth provider mismatch");
            return Err(AppError::unauthorized("Invalid or expired OAuth state"));
        }
        validate_request(&profile)?;

        let user = self.find_or_create_oauth_user(&provider, profile).await?;
        let result = self.generate_tokens_for_user(&user, device).await?;

        let code = random_hex(CODE_BYTES);
        self.cache
            .set_json(
                &keys::oauth_handoff(&code),
                &Handoff {
                    session_id: result.session.id,
                    tokens: result.tokens,
                },
                Duration::from_secs(self.oauth.handoff_ttl_seconds),
            )
            .await?;

        info!(user_id = %user.id, provider = %provider, "OAuth login completed");
        Ok(code)
    }

    async fn find_or_create_oauth_user(
        &self,
        provider: &str,
        profile: OAuthProfile,
    ) -> AppResult<User> {
        if let Some(user) = self
            .users
            .find_by_oauth_identity(provider, &profile.provider_id)
            .await?
        {
            return Ok(user);
        }

        let email = normalize_email(&profile.email);
        if let Some(existing) = self.users.find_by_email(&email).await? {
            return Err(match existing.auth_method {
                AuthMethod::Password => {
                    AppError::conflict("Email is registered with password login")
                }
                AuthMethod::OAuth => {
                    AppError::conflict("Email is linked to a different OAuth identity")
                }
            });
        }

        let user = self
            .users
            .create(CreateUser {
                email,
                password_hash: None,
                first_name: profile.first_name,
                last_name: profile.last_name,
                auth_method: AuthMethod::OAuth,
                oauth_provider: Some(provider.to_string()),
                oauth_provider_id: Some(profile.provider_id),
            })
            .await?;
        info!(user_id = %user.id, provider = %provider, "OAuth user created");
        Ok(user)
    }

    /// Release the tokens parked under `code`. A code works once.
    pub async fn redeem_oauth_handoff(&self, code: &str) -> AppResult<TokenPair> {
        self.interceptors
            .run(
                OperationContext::new(ops::REDEEM_OAUTH_HANDOFF),
                self.redeem_oauth_handoff_inner(code),
            )
            .await
    }

    async fn redeem_oauth_handoff_inner(&self, code: &str) -> AppResult<TokenPair> {
        let handoff: Handoff = self
            .cache
            .take_json(&keys::oauth_handoff(code))
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired handoff code"))?;

        // The client only takes possession of the session now.
        match self.sessions.get(handoff.session_id).await {
            Ok(session) => self.sessions.mark_used(&session).await,
            Err(e) => warn!(session_id = %handoff.session_id, error = %e, "Handoff session lookup failed"),
        }
        Ok(handoff.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;
    use gatehouse_core::error::ErrorKind;

    fn profile(email: &str, provider_id: &str) -> OAuthProfile {
        OAuthProfile {
            email: email.into(),
            first_name: Some("Grace".into()),
            last_name: Some("Hopper".into()),
            provider: "github".into(),
            provider_id: provider_id.into(),
        }
    }

    #[tokio::test]
    async fn test_full_exchange_creates_user_and_hands_off_once() {
        let (service, store) = testing::service();
        let state = service.begin_oauth("github").await.unwrap();

        let code = service
            .complete_oauth(
                &state,
                "github",
                profile("grace@example.com", "gh-1"),
                DeviceInfo::default(),
            )
            .await
            .unwrap();

        let tokens = service.redeem_oauth_handoff(&code).await.unwrap();
        let context = service.validate_token(&tokens.access_token).await.unwrap();
        let user = store.users.find_by_id(context.user_id).await.unwrap().unwrap();
        assert_eq!(user.auth_method, AuthMethod::OAuth);
        assert_eq!(user.oauth_provider.as_deref(), Some("github"));

        let again = service.redeem_oauth_handoff(&code).await.unwrap_err();
        assert_eq!(again.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_state_is_single_use() {
        let (service, _) = testing::service();
        let state = service.begin_oauth("github").await.unwrap();
        service
            .complete_oauth(&state, "github", profile("a@example.com", "1"), DeviceInfo::default())
            .await
            .unwrap();

        let err = service
            .complete_oauth(&state, "github", profile("a@example.com", "1"), DeviceInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_returning_user_reuses_account() {
        let (service, _) = testing::service();
        let mut users = Vec::new();
        for _ in 0..2 {
            let state = service.begin_oauth("github").await.unwrap();
            let code = service
                .complete_oauth(
                    &state,
                    "github",
                    profile("back@example.com", "gh-7"),
                    DeviceInfo::default(),
                )
                .await
                .unwrap();
            let tokens = service.redeem_oauth_handoff(&code).await.unwrap();
            users.push(service.validate_token(&tokens.access_token).await.unwrap().user_id);
        }
        assert_eq!(users[0], users[1]);
    }

    #[tokio::test]
    async fn test_password_account_email_is_rejected() {
        let (service, _) = testing::service();
        testing::register(&service, "pw@example.com").await;
        let state = service.begin_oauth("github").await.unwrap();

        let err = service
            .complete_oauth(&state, "github", profile("pw@example.com", "gh-9"), DeviceInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_provider_allow_list_and_mismatch() {
        let mut config = testing::config();
        config.oauth.allowed_providers = vec!["github".into()];
        let (service, _) = testing::service_with(&config);

        let err = service.begin_oauth("myspace").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let state = service.begin_oauth("github").await.unwrap();
        let err = service
            .complete_oauth(&state, "google", profile("x@example.com", "1"), DeviceInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}
