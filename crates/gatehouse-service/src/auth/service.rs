//! `AuthService` construction and shared helpers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use gatehouse_auth::{
    AccessClaimsInput, KeyPairService, LastUsedDispatcher, PasswordHasher, PasswordValidator,
    RevocationRegistry, ScopeResolver, SessionManager, TokenEngine,
};
use gatehouse_cache::CacheManager;
use gatehouse_core::cancel::CallGuard;
use gatehouse_core::config::{AppConfig, OAuthConfig};
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::{CredentialStore, PasswordResetRepository, UserRepository};
use gatehouse_entity::user::User;

use crate::interceptor::{AuditInterceptor, InterceptorChain, TracingAuditSink};
use crate::notifier::{LoggingResetNotifier, ResetNotifier};

/// Message shared by every credential failure so callers cannot tell an
/// unknown email from a wrong password.
pub(super) const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// The single entry point for authentication flows.
#[derive(Clone)]
pub struct AuthService {
    pub(super) users: Arc<dyn UserRepository>,
    pub(super) password_resets: Arc<dyn PasswordResetRepository>,
    pub(super) engine: TokenEngine,
    pub(super) sessions: SessionManager,
    pub(super) revocations: RevocationRegistry,
    pub(super) key_pairs: KeyPairService,
    pub(super) scopes: ScopeResolver,
    pub(super) hasher: PasswordHasher,
    pub(super) validator: PasswordValidator,
    pub(super) cache: CacheManager,
    pub(super) notifier: Arc<dyn ResetNotifier>,
    pub(super) interceptors: InterceptorChain,
    pub(super) rotate_refresh_tokens: bool,
    pub(super) reset_token_ttl: chrono::Duration,
    pub(super) oauth: OAuthConfig,
    pub(super) store_timeout: Duration,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("engine", &self.engine)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Wire the orchestrator from configuration.
    ///
    /// Fails with `ErrorKind::Configuration` when the signing keys or the
    /// hashing parameters are unusable; callers treat that as fatal.
    pub fn from_config(
        config: &AppConfig,
        store: CredentialStore,
        cache: CacheManager,
        dispatcher: LastUsedDispatcher,
    ) -> AppResult<Self> {
        let engine = TokenEngine::new(&config.auth.token)?;

        let mut revocations = RevocationRegistry::new(Arc::clone(&store.blacklist));
        if config.session.cache_revocations {
            revocations = revocations.with_cache(
                cache.clone(),
                Duration::from_secs(engine.refresh_ttl_seconds()),
            );
        }

        let reset_minutes = i64::try_from(config.auth.password.reset_token_ttl_minutes)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| {
                AppError::configuration("auth.password.reset_token_ttl_minutes must be positive")
            })?;

        let interceptors = InterceptorChain::new()
            .register_global(Arc::new(AuditInterceptor::new(Arc::new(TracingAuditSink))));

        info!(
            algorithm = %config.auth.token.algorithm,
            rotate_refresh_tokens = config.auth.token.rotate_refresh_tokens,
            "Auth service initialized"
        );

        Ok(Self {
            users: Arc::clone(&store.users),
            password_resets: Arc::clone(&store.password_resets),
            sessions: SessionManager::new(Arc::clone(&store.sessions)),
            key_pairs: KeyPairService::new(
                Arc::clone(&store.key_pairs),
                &config.credentials,
                dispatcher,
            )?,
            scopes: ScopeResolver::new(Arc::clone(&store.permissions), config.scopes.clone()),
            hasher: PasswordHasher::for_passwords(&config.auth.password)?,
            validator: PasswordValidator::new(&config.auth.password),
            engine,
            revocations,
            cache,
            notifier: Arc::new(LoggingResetNotifier),
            interceptors,
            rotate_refresh_tokens: config.auth.token.rotate_refresh_tokens,
            reset_token_ttl: chrono::Duration::minutes(reset_minutes),
            oauth: config.oauth.clone(),
            store_timeout: Duration::from_millis(config.session.store_timeout_ms),
        })
    }

    /// Deliver reset tokens through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the interceptor chain. The default chain audits every
    /// operation to the tracing sink.
    pub fn with_interceptors(mut self, interceptors: InterceptorChain) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// The token engine, for callers that need introspection.
    pub fn engine(&self) -> &TokenEngine {
        &self.engine
    }

    /// Store-call limits for a request path.
    pub(super) fn guard(&self, cancel: Option<&CancellationToken>) -> CallGuard {
        let guard = CallGuard::none().with_timeout(self.store_timeout);
        match cancel {
            Some(token) => guard.with_cancel(token.clone()),
            None => guard,
        }
    }

    /// Fields embedded in every access token of `user`.
    pub(super) fn access_claims(user: &User) -> AccessClaimsInput {
        AccessClaimsInput {
            email: Some(user.email.clone()),
            org_id: user.default_organization_id,
            ..AccessClaimsInput::default()
        }
    }

    /// Load a user that must exist and be allowed to authenticate.
    pub(super) async fn active_user(&self, user_id: uuid::Uuid) -> AppResult<User> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User not found"))?;
        if !user.is_active {
            return Err(AppError::forbidden("Account is disabled"));
        }
        Ok(user)
    }
}
