//! Maintenance scheduler configuration.

use serde::{Deserialize, Serialize};

/// Periodic sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the maintenance scheduler runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between expired-session sweeps in seconds.
    #[serde(default = "default_session_sweep")]
    pub session_sweep_interval_seconds: u64,
    /// Interval between blacklist/cutoff sweeps in seconds.
    #[serde(default = "default_revocation_sweep")]
    pub revocation_sweep_interval_seconds: u64,
    /// Interval between password-reset token sweeps in seconds.
    #[serde(default = "default_reset_sweep")]
    pub reset_token_sweep_interval_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_sweep_interval_seconds: default_session_sweep(),
            revocation_sweep_interval_seconds: default_revocation_sweep(),
            reset_token_sweep_interval_seconds: default_reset_sweep(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_session_sweep() -> u64 {
    15 * 60
}

fn default_revocation_sweep() -> u64 {
    60 * 60
}

fn default_reset_sweep() -> u64 {
    60 * 60
}
