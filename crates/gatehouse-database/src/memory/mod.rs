//! In-memory repository implementations backed by `DashMap`.
//!
//! Selected with `database.backend = "memory"` and used throughout the test
//! suites. Uniqueness rules and compare-and-swap semantics match the
//! PostgreSQL implementations; nothing survives a restart.

pub mod blacklist;
pub mod key_pair;
pub mod password_reset;
pub mod permission;
pub mod session;
pub mod user;

pub use blacklist::MemoryBlacklistRepository;
pub use key_pair::MemoryKeyPairRepository;
pub use password_reset::MemoryPasswordResetRepository;
pub use permission::MemoryPermissionRepository;
pub use session::MemorySessionRepository;
pub use user::MemoryUserRepository;
