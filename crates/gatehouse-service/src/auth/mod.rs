//! The auth orchestrator.
//!
//! [`AuthService`] is split by flow: `login` (register, login, token
//! generation), `token` (refresh, logout, validation), `password`
//! (change and reset), `oauth` (state, exchange and handoff), `key_pair`
//! and `admin` (scopes, sessions, bulk revocation).

mod admin;
mod key_pair;
mod login;
mod oauth;
mod password;
mod service;
mod token;

pub use service::AuthService;

/// Operation names used as interceptor keys and in audit events.
pub mod ops {
    /// Password account registration.
    pub const REGISTER: &str = "auth.register";
    /// Email and password login.
    pub const LOGIN: &str = "auth.login";
    /// Refresh-token exchange.
    pub const REFRESH: &str = "auth.refresh";
    /// Logout of one session.
    pub const LOGOUT: &str = "auth.logout";
    /// Bearer token validation.
    pub const VALIDATE_TOKEN: &str = "auth.validate_token";
    /// Password change.
    pub const CHANGE_PASSWORD: &str = "auth.change_password";
    /// Password reset request.
    pub const REQUEST_PASSWORD_RESET: &str = "auth.request_password_reset";
    /// Password reset redemption.
    pub const RESET_PASSWORD: &str = "auth.reset_password";
    /// OAuth state issuance.
    pub const BEGIN_OAUTH: &str = "auth.oauth.begin";
    /// OAuth profile exchange.
    pub const COMPLETE_OAUTH: &str = "auth.oauth.complete";
    /// OAuth handoff redemption.
    pub const REDEEM_OAUTH_HANDOFF: &str = "auth.oauth.redeem";
    /// Key-pair creation.
    pub const CREATE_KEY_PAIR: &str = "auth.key_pair.create";
    /// Key-pair revocation.
    pub const REVOKE_KEY_PAIR: &str = "auth.key_pair.revoke";
    /// Key-pair validation.
    pub const VALIDATE_KEY_PAIR: &str = "auth.key_pair.validate";
    /// Key-pair exchange for an API-key token.
    pub const EXCHANGE_KEY_PAIR: &str = "auth.key_pair.exchange";
    /// Scope resolution.
    pub const GET_USER_SCOPES: &str = "auth.scopes";
    /// Bulk revocation of a user's tokens.
    pub const REVOKE_ALL_USER_TOKENS: &str = "auth.revoke_all";
    /// Session listing.
    pub const LIST_SESSIONS: &str = "auth.sessions.list";
    /// Single session revocation.
    pub const REVOKE_SESSION: &str = "auth.sessions.revoke";
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use gatehouse_auth::LastUsedDispatcher;
    use gatehouse_cache::CacheManager;
    use gatehouse_core::config::AppConfig;
    use gatehouse_database::CredentialStore;
    use gatehouse_entity::session::DeviceInfo;

    use super::AuthService;
    use crate::dto::RegisterRequest;
    use crate::dto::LoginResult;

    pub const PASSWORD: &str = "tangerine-Orbit-42-quietly";

    /// Configuration with cheap argon2 costs and an HMAC secret.
    pub fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.token.secret = Some("0123456789abcdef0123456789abcdef".into());
        config.auth.password.memory_cost_kib = 1024;
        config.auth.password.time_cost = 1;
        config.auth.password.parallelism = 1;
        config.credentials.memory_cost_kib = 1024;
        config.credentials.time_cost = 1;
        config.credentials.parallelism = 1;
        config
    }

    pub fn service_with(config: &AppConfig) -> (AuthService, CredentialStore) {
        let store = CredentialStore::in_memory();
        let (dispatcher, _worker) = LastUsedDispatcher::spawn(Arc::clone(&store.key_pairs), 16);
        let service = AuthService::from_config(
            config,
            store.clone(),
            CacheManager::in_memory(),
            dispatcher,
        )
        .unwrap();
        (service, store)
    }

    pub fn service() -> (AuthService, CredentialStore) {
        service_with(&config())
    }

    pub async fn register(service: &AuthService, email: &str) -> LoginResult {
        service
            .register(
                RegisterRequest {
                    email: email.into(),
                    password: PASSWORD.into(),
                    first_name: Some("Ada".into()),
                    last_name: None,
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap()
    }
}
