//! # gatehouse-auth
//!
//! Authentication and authorization building blocks for Gatehouse.
//!
//! ## Modules
//!
//! - `jwt`: token engine issuing and verifying access, refresh and API-key tokens
//! - `password`: Argon2id hashing and password policy enforcement
//! - `session`: server-side session lifecycle (create, rotate, revoke, sweep)
//! - `revocation`: JTI blacklist and per-user issued-at cutoffs
//! - `credential`: key-pair issuance and validation
//! - `scope`: effective permission resolution across organization and project

pub mod credential;
pub mod digest;
pub mod jwt;
pub mod password;
pub mod revocation;
pub mod scope;
pub mod session;

pub use credential::{IssueKeyPair, KeyPairService, LastUsedDispatcher};
pub use jwt::{AccessClaimsInput, Claims, IssuedToken, TokenEngine, TokenError, TokenType};
pub use password::{PasswordHasher, PasswordValidator};
pub use revocation::RevocationRegistry;
pub use scope::{ScopeResolution, ScopeResolver};
pub use session::SessionManager;
