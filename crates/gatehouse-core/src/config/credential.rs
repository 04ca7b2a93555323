//! Key-pair issuance configuration.

use serde::{Deserialize, Serialize};

/// Key-pair credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Prefix of every public key.
    #[serde(default = "default_public_prefix")]
    pub public_key_prefix: String,
    /// Prefix of every secret key.
    #[serde(default = "default_secret_prefix")]
    pub secret_key_prefix: String,
    /// Scope that satisfies every requirement.
    #[serde(default = "default_universal_scope")]
    pub universal_scope: String,
    /// Rate limit assigned when the caller does not pick one (requests/minute).
    #[serde(default = "default_rate_limit")]
    pub default_rate_limit_per_minute: i32,
    /// Argon2 memory cost in KiB for secret hashing.
    #[serde(default = "default_memory_cost")]
    pub memory_cost_kib: u32,
    /// Argon2 iteration count for secret hashing.
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,
    /// Argon2 lanes for secret hashing.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    /// Capacity of the last-used update queue; updates beyond it are dropped.
    #[serde(default = "default_queue_capacity")]
    pub last_used_queue_capacity: usize,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            public_key_prefix: default_public_prefix(),
            secret_key_prefix: default_secret_prefix(),
            universal_scope: default_universal_scope(),
            default_rate_limit_per_minute: default_rate_limit(),
            memory_cost_kib: default_memory_cost(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
            last_used_queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_public_prefix() -> String {
    "pk_".to_string()
}

fn default_secret_prefix() -> String {
    "sk_".to_string()
}

fn default_universal_scope() -> String {
    "*".to_string()
}

fn default_rate_limit() -> i32 {
    1000
}

fn default_memory_cost() -> u32 {
    19_456
}

fn default_time_cost() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

fn default_queue_capacity() -> usize {
    1024
}
