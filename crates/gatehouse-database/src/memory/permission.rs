//! In-memory role, permission and membership repository.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::permission::{OrganizationMember, Permission, Role, ScopeLevel};

use crate::repository::PermissionRepository;

/// `DashMap`-backed [`PermissionRepository`].
#[derive(Debug, Default)]
pub struct MemoryPermissionRepository {
    permissions: DashMap<Uuid, Permission>,
    permission_names: DashMap<String, Uuid>,
    roles: DashMap<Uuid, Role>,
    role_names: DashMap<(Uuid, String), Uuid>,
    grants: DashSet<(Uuid, Uuid)>,
    members: DashMap<(Uuid, Uuid), OrganizationMember>,
}

#[async_trait]
impl PermissionRepository for MemoryPermissionRepository {
    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
        level: ScopeLevel,
    ) -> AppResult<Permission> {
        match self.permission_names.entry(name.to_string()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Permission '{name}' already exists"
            ))),
            Entry::Vacant(slot) => {
                let permission = Permission {
                    id: Uuid::now_v7(),
                    name: name.to_string(),
                    description: description.map(str::to_string),
                    level,
                    created_at: Utc::now(),
                };
                self.permissions.insert(permission.id, permission.clone());
                slot.insert(permission.id);
                Ok(permission)
            }
        }
    }

    async fn list_permissions(&self, level: Option<ScopeLevel>) -> AppResult<Vec<Permission>> {
        let mut permissions: Vec<Permission> = self
            .permissions
            .iter()
            .filter(|p| level.is_none_or(|l| p.level == l))
            .map(|p| p.clone())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn create_role(
        &self,
        organization_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Role> {
        match self.role_names.entry((organization_id, name.to_string())) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Role '{name}' already exists in organization {organization_id}"
            ))),
            Entry::Vacant(slot) => {
                let role = Role {
                    id: Uuid::now_v7(),
                    organization_id,
                    name: name.to_string(),
                    description: description.map(str::to_string),
                    created_at: Utc::now(),
                };
                self.roles.insert(role.id, role.clone());
                slot.insert(role.id);
                Ok(role)
            }
        }
    }

    async fn grant_permission(&self, role_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        if !self.roles.contains_key(&role_id) {
            return Err(AppError::not_found(format!("Role {role_id} not found")));
        }
        if !self.permissions.contains_key(&permission_id) {
            return Err(AppError::not_found(format!(
                "Permission {permission_id} not found"
            )));
        }
        if !self.grants.insert((role_id, permission_id)) {
            return Err(AppError::conflict("Permission already granted to role"));
        }
        Ok(())
    }

    async fn add_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<OrganizationMember> {
        if !self.roles.contains_key(&role_id) {
            return Err(AppError::not_found(format!("Role {role_id} not found")));
        }
        match self.members.entry((organization_id, user_id)) {
            Entry::Occupied(_) => Err(AppError::conflict(
                "User is already a member of the organization",
            )),
            Entry::Vacant(slot) => {
                let member = OrganizationMember {
                    organization_id,
                    user_id,
                    role_id,
                    created_at: Utc::now(),
                };
                Ok(slot.insert(member).clone())
            }
        }
    }

    async fn find_member_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Option<Role>> {
        let role_id = self
            .members
            .get(&(organization_id, user_id))
            .map(|m| m.role_id);
        Ok(role_id.and_then(|id| self.roles.get(&id).map(|r| r.clone())))
    }

    async fn find_member_permissions(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Vec<Permission>> {
        let Some(role_id) = self
            .members
            .get(&(organization_id, user_id))
            .map(|m| m.role_id)
        else {
            return Ok(Vec::new());
        };

        let permission_ids: Vec<Uuid> = self
            .grants
            .iter()
            .filter(|grant| grant.0 == role_id)
            .map(|grant| grant.1)
            .collect();

        let mut permissions: Vec<Permission> = permission_ids
            .iter()
            .filter_map(|id| self.permissions.get(id).map(|p| p.clone()))
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }
}
