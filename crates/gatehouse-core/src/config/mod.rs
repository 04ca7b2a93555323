//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. The loaded [`AppConfig`] is immutable and shared by value or
//! behind an `Arc`; nothing mutates it after startup.

pub mod auth;
pub mod cache;
pub mod credential;
pub mod database;
pub mod logging;
pub mod oauth;
pub mod scope;
pub mod session;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::auth::{AuthConfig, PasswordConfig, SigningAlgorithm, TokenConfig};
pub use self::cache::CacheConfig;
pub use self::credential::CredentialConfig;
pub use self::database::{DatabaseBackend, DatabaseConfig};
pub use self::logging::LoggingConfig;
pub use self::oauth::OAuthConfig;
pub use self::scope::ScopeConfig;
pub use self::session::SessionConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Credential store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache / ephemeral store settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Token signing and password settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Session and revocation settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Key-pair issuance settings.
    #[serde(default)]
    pub credentials: CredentialConfig,
    /// Role shortcut settings for scope resolution.
    #[serde(default)]
    pub scopes: ScopeConfig,
    /// OAuth exchange settings.
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Maintenance scheduler settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `GATEHOUSE__`
    /// (e.g. `GATEHOUSE__AUTH__TOKEN__SECRET`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("GATEHOUSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scopes.admin_excluded_permissions")
                    .with_list_parse_key("oauth.allowed_providers"),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_yields_defaults() {
        let config: AppConfig = config::Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("defaults should deserialize");

        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert_eq!(config.auth.token.algorithm, SigningAlgorithm::Hs256);
        assert_eq!(config.auth.token.access_ttl_seconds, 900);
        assert!(config.auth.token.rotate_refresh_tokens);
        assert_eq!(config.oauth.state_ttl_seconds, 300);
        assert_eq!(config.auth.password.reset_token_ttl_minutes, 60);
    }

    #[test]
    fn test_toml_overrides_nested_sections() {
        let toml = r#"
            [auth.token]
            algorithm = "RS256"
            issuer = "https://auth.example.test"
            rotate_refresh_tokens = false

            [scopes]
            admin_excluded_permissions = ["organization:delete"]
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("toml should deserialize");

        assert_eq!(config.auth.token.algorithm, SigningAlgorithm::Rs256);
        assert_eq!(config.auth.token.issuer, "https://auth.example.test");
        assert!(!config.auth.token.rotate_refresh_tokens);
        assert_eq!(
            config.scopes.admin_excluded_permissions,
            vec!["organization:delete".to_string()]
        );
    }
}
