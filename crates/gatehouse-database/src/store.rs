//! Bundle of repository handles injected into the auth services.

use std::sync::Arc;

use sqlx::PgPool;

use crate::memory::{
    MemoryBlacklistRepository, MemoryKeyPairRepository, MemoryPasswordResetRepository,
    MemoryPermissionRepository, MemorySessionRepository, MemoryUserRepository,
};
use crate::postgres::{
    PgBlacklistRepository, PgKeyPairRepository, PgPasswordResetRepository,
    PgPermissionRepository, PgSessionRepository, PgUserRepository,
};
use crate::repository::{
    BlacklistRepository, KeyPairRepository, PasswordResetRepository, PermissionRepository,
    SessionRepository, UserRepository,
};

/// Every repository the auth core depends on.
#[derive(Clone)]
pub struct CredentialStore {
    /// User accounts.
    pub users: Arc<dyn UserRepository>,
    /// Login sessions.
    pub sessions: Arc<dyn SessionRepository>,
    /// Revoked JTIs and user cutoffs.
    pub blacklist: Arc<dyn BlacklistRepository>,
    /// Issued key pairs.
    pub key_pairs: Arc<dyn KeyPairRepository>,
    /// Password reset tokens.
    pub password_resets: Arc<dyn PasswordResetRepository>,
    /// Roles and permissions.
    pub permissions: Arc<dyn PermissionRepository>,
}

impl CredentialStore {
    /// Repositories backed by PostgreSQL.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            blacklist: Arc::new(PgBlacklistRepository::new(pool.clone())),
            key_pairs: Arc::new(PgKeyPairRepository::new(pool.clone())),
            password_resets: Arc::new(PgPasswordResetRepository::new(pool.clone())),
            permissions: Arc::new(PgPermissionRepository::new(pool)),
        }
    }

    /// Process-local repositories.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryUserRepository::default()),
            sessions: Arc::new(MemorySessionRepository::default()),
            blacklist: Arc::new(MemoryBlacklistRepository::default()),
            key_pairs: Arc::new(MemoryKeyPairRepository::default()),
            password_resets: Arc::new(MemoryPasswordResetRepository::default()),
            permissions: Arc::new(MemoryPermissionRepository::default()),
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
