//! Permission, role and membership rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Level of the hierarchy a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scope_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
    /// Applies to the organization as a whole.
    Organization,
    /// Applies to projects inside the organization.
    Project,
}

impl ScopeLevel {
    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Project => "project",
        }
    }
}

impl std::fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named permission, e.g. `project:read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: Uuid,
    /// `resource:action` name; unique.
    pub name: String,
    /// Description for administrators.
    pub description: Option<String>,
    /// Hierarchy level.
    pub level: ScopeLevel,
    /// When the permission was created.
    pub created_at: DateTime<Utc>,
}

/// A role defined inside one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: Uuid,
    /// Owning organization.
    pub organization_id: Uuid,
    /// Role name; unique within the organization.
    pub name: String,
    /// Description for administrators.
    pub description: Option<String>,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

/// A user's membership (and single role) in an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrganizationMember {
    /// Organization.
    pub organization_id: Uuid,
    /// Member.
    pub user_id: Uuid,
    /// Role held.
    pub role_id: Uuid,
    /// When the membership was created.
    pub created_at: DateTime<Utc>,
}
