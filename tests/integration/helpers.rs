//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use gatehouse_auth::LastUsedDispatcher;
use gatehouse_auth::credential::dispatcher::LastUsedWorker;
use gatehouse_cache::CacheManager;
use gatehouse_core::config::AppConfig;
use gatehouse_database::CredentialStore;
use gatehouse_entity::session::DeviceInfo;
use gatehouse_service::AuthService;
use gatehouse_service::LoginResult;
use gatehouse_service::dto::{LoginRequest, RegisterRequest};

/// Password accepted by the default policy.
pub const PASSWORD: &str = "marble-Canyon-58-gently";

/// Test application context over in-memory storage.
pub struct TestApp {
    /// The auth orchestrator under test.
    pub service: AuthService,
    /// Direct repository access for assertions.
    pub store: CredentialStore,
    /// Application config.
    pub config: AppConfig,
    /// Background writer for key-pair last-used stamps.
    pub last_used: LastUsedWorker,
}

impl TestApp {
    /// Create a test application with the default test config.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a test application with `config`.
    pub fn with_config(config: AppConfig) -> Self {
        let store = CredentialStore::in_memory();
        let (dispatcher, last_used) =
            LastUsedDispatcher::spawn(Arc::clone(&store.key_pairs), 64);
        let service = AuthService::from_config(
            &config,
            store.clone(),
            CacheManager::in_memory(),
            dispatcher,
        )
        .expect("Failed to build auth service");

        Self {
            service,
            store,
            config,
            last_used,
        }
    }

    /// Register a password user.
    pub async fn register(&self, email: &str) -> LoginResult {
        self.service
            .register(
                RegisterRequest {
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                    first_name: Some("Test".to_string()),
                    last_name: Some("User".to_string()),
                },
                DeviceInfo::default(),
            )
            .await
            .expect("Failed to register test user")
    }

    /// Log in with the test password from a named device.
    pub async fn login(&self, email: &str, device: &str) -> LoginResult {
        self.service
            .login(
                LoginRequest {
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                },
                DeviceInfo {
                    device_name: Some(device.to_string()),
                    ..DeviceInfo::default()
                },
            )
            .await
            .expect("Failed to log in test user")
    }
}

/// HMAC signing and cheap Argon2 parameters.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.token.secret = Some("integration-secret-0123456789abcdef".to_string());
    config.auth.password.memory_cost_kib = 1024;
    config.auth.password.time_cost = 1;
    config.credentials.memory_cost_kib = 1024;
    config.credentials.time_cost = 1;
    config
}
