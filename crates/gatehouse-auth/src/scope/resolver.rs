//! Scope resolver over roles, permissions and organization membership.
//!
//! Resolution order:
//! 1. No organization: global scopes only.
//! 2. Project without organization: validation error.
//! 3. No membership in the organization: no scopes.
//! 4. Owner role: every permission in the catalog at each requested level.
//! 5. Admin role: same, minus the configured destructive permissions.
//! 6. Any other role: the role's granted permissions, split by level.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use gatehouse_core::config::ScopeConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::PermissionRepository;
use gatehouse_entity::permission::{Permission, ScopeLevel};

use super::resolution::ScopeResolution;

/// Computes effective scopes on demand. Never writes.
#[derive(Clone)]
pub struct ScopeResolver {
    permissions: Arc<dyn PermissionRepository>,
    config: ScopeConfig,
}

impl std::fmt::Debug for ScopeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// How a role maps to permissions.
enum Grant {
    All,
    AllExceptExcluded,
    Explicit(Vec<Permission>),
}

impl ScopeResolver {
    /// Creates a new resolver.
    pub fn new(permissions: Arc<dyn PermissionRepository>, config: ScopeConfig) -> Self {
        Self {
            permissions,
            config,
        }
    }

    /// Resolve the scopes of `user_id` in the given context.
    pub async fn resolve(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> AppResult<ScopeResolution> {
        let Some(org_id) = organization_id else {
            if project_id.is_some() {
                return Err(AppError::validation(
                    "Project scopes require an organization context",
                ));
            }
            return Ok(ScopeResolution::empty(user_id, None, None));
        };

        let Some(role) = self.permissions.find_member_role(user_id, org_id).await? else {
            debug!(user_id = %user_id, organization_id = %org_id, "Not a member");
            return Ok(ScopeResolution::empty(user_id, organization_id, project_id));
        };

        let grant = if role.name == self.config.owner_role {
            Grant::All
        } else if role.name == self.config.admin_role {
            Grant::AllExceptExcluded
        } else {
            Grant::Explicit(
                self.permissions
                    .find_member_permissions(user_id, org_id)
                    .await?,
            )
        };

        let organization_scopes = self.scopes_at(&grant, ScopeLevel::Organization).await?;
        let project_scopes = match project_id {
            Some(_) => self.scopes_at(&grant, ScopeLevel::Project).await?,
            None => Vec::new(),
        };

        debug!(
            user_id = %user_id,
            organization_id = %org_id,
            role = %role.name,
            organization_scopes = organization_scopes.len(),
            project_scopes = project_scopes.len(),
            "Scopes resolved"
        );

        Ok(ScopeResolution::new(
            user_id,
            organization_id,
            project_id,
            Some(role.name),
            Vec::new(),
            organization_scopes,
            project_scopes,
        ))
    }

    async fn scopes_at(&self, grant: &Grant, level: ScopeLevel) -> AppResult<Vec<String>> {
        let names = match grant {
            Grant::All => self.catalog(level).await?,
            Grant::AllExceptExcluded => self
                .catalog(level)
                .await?
                .into_iter()
                .filter(|name| !self.config.admin_excluded_permissions.contains(name))
                .collect(),
            Grant::Explicit(granted) => granted
                .iter()
                .filter(|p| p.level == level)
                .map(|p| p.name.clone())
                .collect(),
        };
        Ok(names)
    }

    async fn catalog(&self, level: ScopeLevel) -> AppResult<Vec<String>> {
        Ok(self
            .permissions
            .list_permissions(Some(level))
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect())
    }
}
