//! Role, permission and membership repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::permission::{OrganizationMember, Permission, Role, ScopeLevel};

use crate::error::db_error;
use crate::repository::PermissionRepository;

/// PostgreSQL-backed [`PermissionRepository`].
#[derive(Debug, Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
        level: ScopeLevel,
    ) -> AppResult<Permission> {
        sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (id, name, description, level) VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(description)
        .bind(level)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create permission"))
    }

    async fn list_permissions(&self, level: Option<ScopeLevel>) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE ($1::scope_level IS NULL OR level = $1) ORDER BY name",
        )
        .bind(level)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list permissions"))
    }

    async fn create_role(
        &self,
        organization_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, organization_id, name, description) VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(organization_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create role"))
    }

    async fn grant_permission(&self, role_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to grant permission"))?;
        Ok(())
    }

    async fn add_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<OrganizationMember> {
        sqlx::query_as::<_, OrganizationMember>(
            "INSERT INTO organization_members (organization_id, user_id, role_id) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to add organization member"))
    }

    async fn find_member_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT r.* FROM roles r \
             JOIN organization_members m ON m.role_id = r.id \
             WHERE m.user_id = $1 AND m.organization_id = $2",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find member role"))
    }

    async fn find_member_permissions(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(
            "SELECT DISTINCT p.* FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN organization_members m ON m.role_id = rp.role_id \
             WHERE m.user_id = $1 AND m.organization_id = $2 \
             ORDER BY p.name",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to find member permissions"))
    }
}
