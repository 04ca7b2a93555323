//! Revocation entities: per-token blacklist entries and per-user cutoffs.

pub mod model;
pub mod reason;

pub use model::{BlacklistEntry, UserRevocation};
pub use reason::RevocationReason;
