//! # gatehouse-database
//!
//! The credential store: async repository contracts for every table the
//! auth core touches, a PostgreSQL implementation of each, and an
//! in-memory implementation used for development and tests.

pub mod connection;
pub mod error;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repository;
pub mod store;

pub use connection::DatabasePool;
pub use repository::{
    BlacklistRepository, KeyPairRepository, PasswordResetRepository, PermissionRepository,
    SessionRepository, UserRepository,
};
pub use store::CredentialStore;
