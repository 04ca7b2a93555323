//! Key-pair credential entities.

pub mod model;

pub use model::{CreateKeyPair, IssuedKeyPair, KeyPair, KeyPairChanges};
