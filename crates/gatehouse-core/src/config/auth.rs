//! Token signing and password configuration.

use serde::{Deserialize, Serialize};

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token signing settings.
    #[serde(default)]
    pub token: TokenConfig,
    /// Password hashing and policy settings.
    #[serde(default)]
    pub password: PasswordConfig,
}

/// Signing algorithm family. Exactly one is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC-SHA256 with a shared secret.
    #[default]
    #[serde(rename = "HS256", alias = "hs256")]
    Hs256,
    /// RSASSA-PKCS1-v1_5 with SHA-256; private key signs, public key verifies.
    #[serde(rename = "RS256", alias = "rs256")]
    Rs256,
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hs256 => write!(f, "HS256"),
            Self::Rs256 => write!(f, "RS256"),
        }
    }
}

/// JWT issuance configuration.
///
/// For `HS256` only `secret` is read. For `RS256` each key is taken from
/// its `*_path` when set, otherwise from the inline base64-encoded PEM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Signing algorithm.
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
    /// Shared secret for `HS256`.
    #[serde(default)]
    pub secret: Option<String>,
    /// Path to the PEM private key (PKCS#1 or PKCS#8).
    #[serde(default)]
    pub private_key_path: Option<String>,
    /// Base64-encoded PEM private key.
    #[serde(default)]
    pub private_key_base64: Option<String>,
    /// Path to the PEM public key.
    #[serde(default)]
    pub public_key_path: Option<String>,
    /// Base64-encoded PEM public key.
    #[serde(default)]
    pub public_key_base64: Option<String>,
    /// Value of the `iss` claim; verification rejects any other issuer.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_seconds: u64,
    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_seconds: u64,
    /// API-key token lifetime in seconds.
    #[serde(default = "default_api_key_ttl")]
    pub api_key_ttl_seconds: u64,
    /// Clock skew tolerated on `exp`/`nbf` in seconds.
    #[serde(default)]
    pub leeway_seconds: u64,
    /// Issue a new refresh token on every refresh and retire the old one.
    #[serde(default = "default_true")]
    pub rotate_refresh_tokens: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::default(),
            secret: None,
            private_key_path: None,
            private_key_base64: None,
            public_key_path: None,
            public_key_base64: None,
            issuer: default_issuer(),
            access_ttl_seconds: default_access_ttl(),
            refresh_ttl_seconds: default_refresh_ttl(),
            api_key_ttl_seconds: default_api_key_ttl(),
            leeway_seconds: 0,
            rotate_refresh_tokens: true,
        }
    }
}

/// Password hashing (argon2id) and policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub min_length: usize,
    /// Maximum password length.
    #[serde(default = "default_password_max")]
    pub max_length: usize,
    /// Minimum zxcvbn score (0-4).
    #[serde(default = "default_min_score")]
    pub min_strength_score: u8,
    /// Argon2 memory cost in KiB.
    #[serde(default = "default_memory_cost")]
    pub memory_cost_kib: u32,
    /// Argon2 iteration count.
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,
    /// Argon2 lanes.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    /// Password reset token lifetime in minutes.
    #[serde(default = "default_reset_ttl")]
    pub reset_token_ttl_minutes: u64,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: default_password_min(),
            max_length: default_password_max(),
            min_strength_score: default_min_score(),
            memory_cost_kib: default_memory_cost(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
            reset_token_ttl_minutes: default_reset_ttl(),
        }
    }
}

fn default_issuer() -> String {
    "gatehouse".to_string()
}

fn default_access_ttl() -> u64 {
    15 * 60
}

fn default_refresh_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_api_key_ttl() -> u64 {
    5 * 60
}

fn default_true() -> bool {
    true
}

fn default_password_min() -> usize {
    8
}

fn default_password_max() -> usize {
    128
}

fn default_min_score() -> u8 {
    2
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

fn default_reset_ttl() -> u64 {
    60
}
