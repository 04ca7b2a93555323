//! Revocation registry: JTI blacklist and per-user issued-at cutoffs.

pub mod registry;

pub use registry::RevocationRegistry;
