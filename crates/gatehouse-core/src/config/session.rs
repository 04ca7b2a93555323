//! Session and revocation configuration.

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound in milliseconds for a single credential store call made
    /// on a request path. `0` disables the deadline.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    /// How long a per-user revocation cutoff is kept, in hours. Must exceed
    /// the longest token lifetime or revoked tokens become valid again.
    #[serde(default = "default_cutoff_retention")]
    pub revocation_cutoff_retention_hours: u64,
    /// Cache revocation lookups (positive JTI hits and user cutoffs).
    #[serde(default = "default_true")]
    pub cache_revocations: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout(),
            revocation_cutoff_retention_hours: default_cutoff_retention(),
            cache_revocations: true,
        }
    }
}

fn default_store_timeout() -> u64 {
    2_000
}

fn default_cutoff_retention() -> u64 {
    8 * 24
}

fn default_true() -> bool {
    true
}
