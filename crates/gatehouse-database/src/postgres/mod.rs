//! PostgreSQL repository implementations.

pub mod blacklist;
pub mod key_pair;
pub mod password_reset;
pub mod permission;
pub mod session;
pub mod user;

pub use blacklist::PgBlacklistRepository;
pub use key_pair::PgKeyPairRepository;
pub use password_reset::PgPasswordResetRepository;
pub use permission::PgPermissionRepository;
pub use session::PgSessionRepository;
pub use user::PgUserRepository;
