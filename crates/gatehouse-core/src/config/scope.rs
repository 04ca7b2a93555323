//! Role shortcut configuration for scope resolution.

use serde::{Deserialize, Serialize};

/// Role names that short-circuit permission lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Role granted every permission of the requested level.
    #[serde(default = "default_owner_role")]
    pub owner_role: String,
    /// Role granted every permission except the excluded ones.
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    /// Destructive permissions withheld from the admin role.
    #[serde(default = "default_admin_excluded")]
    pub admin_excluded_permissions: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            owner_role: default_owner_role(),
            admin_role: default_admin_role(),
            admin_excluded_permissions: default_admin_excluded(),
        }
    }
}

fn default_owner_role() -> String {
    "owner".to_string()
}

fn default_admin_role() -> String {
    "admin".to_string()
}

fn default_admin_excluded() -> Vec<String> {
    vec!["organization:delete".to_string(), "project:delete".to_string()]
}
