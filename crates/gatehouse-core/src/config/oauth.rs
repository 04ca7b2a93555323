//! OAuth exchange configuration.

use serde::{Deserialize, Serialize};

/// OAuth state and one-time handoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Lifetime of a CSRF state value in seconds.
    #[serde(default = "default_ttl")]
    pub state_ttl_seconds: u64,
    /// Lifetime of a one-time token handoff code in seconds.
    #[serde(default = "default_ttl")]
    pub handoff_ttl_seconds: u64,
    /// Providers accepted by `begin_oauth`. Empty accepts any.
    #[serde(default)]
    pub allowed_providers: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_ttl(),
            handoff_ttl_seconds: default_ttl(),
            allowed_providers: Vec::new(),
        }
    }
}

fn default_ttl() -> u64 {
    5 * 60
}
