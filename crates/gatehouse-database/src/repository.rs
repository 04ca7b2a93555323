//! Credential store contracts.
//!
//! Every lookup returns `Ok(None)` for a missing row; callers decide whether
//! absence is `NotFound` or `Unauthorized`. Writes that would duplicate a
//! unique value fail with `ErrorKind::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::credential::{CreateKeyPair, KeyPair, KeyPairChanges};
use gatehouse_entity::password::PasswordResetToken;
use gatehouse_entity::permission::{OrganizationMember, Permission, Role, ScopeLevel};
use gatehouse_entity::revocation::{BlacklistEntry, RevocationReason, UserRevocation};
use gatehouse_entity::session::{CreateSession, Session, SessionRotation};
use gatehouse_entity::user::{CreateUser, User};

/// User accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find a user by OAuth provider identity.
    async fn find_by_oauth_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> AppResult<Option<User>>;

    /// Create a user. Conflict if the email is taken.
    async fn create(&self, data: CreateUser) -> AppResult<User>;

    /// Replace the password hash. NotFound if the user does not exist.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Stamp the last successful login.
    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Activate or deactivate an account. NotFound if the user does not exist.
    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<()>;
}

/// Login sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new active session.
    async fn create(&self, data: CreateSession) -> AppResult<Session>;

    /// Find a session by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>>;

    /// Find a session by the hash of its current refresh token.
    async fn find_by_refresh_token_hash(&self, hash: &str) -> AppResult<Option<Session>>;

    /// Find the session whose current access token has this JTI.
    async fn find_by_current_jti(&self, jti: Uuid) -> AppResult<Option<Session>>;

    /// Active sessions of a user, newest first.
    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// Apply `rotation` only if the row still holds the expected refresh hash
    /// and JTI and is active. Returns the updated row, or `None` when another
    /// writer got there first.
    async fn rotate_if_unchanged(&self, rotation: &SessionRotation) -> AppResult<Option<Session>>;

    /// Stamp `last_used_at`.
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Mark a session inactive. Returns `false` if it was already inactive or missing.
    async fn revoke(&self, id: Uuid, reason: RevocationReason) -> AppResult<bool>;

    /// Mark every active session of a user inactive. Returns how many changed.
    async fn revoke_all_for_user(&self, user_id: Uuid, reason: RevocationReason) -> AppResult<u64>;

    /// Delete sessions whose access and refresh tokens both expired before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Revoked JTIs and per-user issued-at cutoffs.
#[async_trait]
pub trait BlacklistRepository: Send + Sync {
    /// Record a revoked JTI. Inserting an existing JTI is a no-op.
    async fn insert(&self, entry: BlacklistEntry) -> AppResult<()>;

    /// Look up a revoked JTI.
    async fn find(&self, jti: Uuid) -> AppResult<Option<BlacklistEntry>>;

    /// Delete entries whose token expired before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Record a user cutoff. An existing cutoff only ever moves forward.
    async fn upsert_user_revocation(&self, revocation: UserRevocation)
    -> AppResult<UserRevocation>;

    /// Current cutoff for a user.
    async fn find_user_revocation(&self, user_id: Uuid) -> AppResult<Option<UserRevocation>>;

    /// Delete cutoffs older than `before`.
    async fn delete_user_revocations_before(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Issued key pairs.
#[async_trait]
pub trait KeyPairRepository: Send + Sync {
    /// Persist a key pair. Conflict if the public key already exists.
    async fn create(&self, data: CreateKeyPair) -> AppResult<KeyPair>;

    /// Find a key pair by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<KeyPair>>;

    /// Find a key pair by its public key.
    async fn find_by_public_key(&self, public_key: &str) -> AppResult<Option<KeyPair>>;

    /// Key pairs of a project, newest first.
    async fn find_by_project(&self, project_id: Uuid) -> AppResult<Vec<KeyPair>>;

    /// Apply a partial update. NotFound if the key pair does not exist.
    async fn update(&self, id: Uuid, changes: &KeyPairChanges) -> AppResult<KeyPair>;

    /// Deactivate a key pair. Returns `false` if it was already inactive.
    /// NotFound if the key pair does not exist.
    async fn deactivate(&self, id: Uuid) -> AppResult<bool>;

    /// Stamp `last_used_at`.
    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

/// Password reset tokens.
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Persist a new reset token.
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<PasswordResetToken>;

    /// Find a token by the hash of its raw value.
    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<PasswordResetToken>>;

    /// Consume a token. Returns `false` if it was already used, so at most
    /// one caller succeeds.
    async fn mark_used(&self, id: Uuid) -> AppResult<bool>;

    /// Mark every unused token of a user as used. Returns how many changed.
    async fn invalidate_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    /// Delete tokens that expired before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Roles, permissions and organization membership.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Define a permission. Conflict if the name exists.
    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
        level: ScopeLevel,
    ) -> AppResult<Permission>;

    /// The permission catalog, optionally restricted to one level.
    async fn list_permissions(&self, level: Option<ScopeLevel>) -> AppResult<Vec<Permission>>;

    /// Define a role in an organization. Conflict if the name exists there.
    async fn create_role(
        &self,
        organization_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Role>;

    /// Grant a permission to a role. Conflict if already granted.
    async fn grant_permission(&self, role_id: Uuid, permission_id: Uuid) -> AppResult<()>;

    /// Add a user to an organization with a role. Conflict if already a member.
    async fn add_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<OrganizationMember>;

    /// The role a user holds in an organization.
    async fn find_member_role(&self, user_id: Uuid, organization_id: Uuid)
    -> AppResult<Option<Role>>;

    /// Permissions granted through the user's role in an organization.
    async fn find_member_permissions(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Vec<Permission>>;
}
