//! Key-pair credentials: generation, format checks, issuance and validation.

pub mod dispatcher;
pub mod format;
pub mod generator;
pub mod service;

pub use dispatcher::LastUsedDispatcher;
pub use format::{KeyFormat, KeyFormatError};
pub use generator::KeyGenerator;
pub use service::{IssueKeyPair, KeyPairService};
