//! Random key material for new key pairs.

use uuid::Uuid;

use crate::digest::random_hex;

use super::format::{KeyFormat, PUBLIC_RANDOM_HEX, SECRET_HEX};

/// Generates public/secret key strings from the thread-local OS-seeded RNG.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    format: KeyFormat,
}

impl KeyGenerator {
    /// Generator producing keys in `format`.
    pub fn new(format: KeyFormat) -> Self {
        Self { format }
    }

    /// A new public key embedding `project_id`.
    pub fn public_key(&self, project_id: Uuid) -> String {
        self.format
            .public_key(project_id, &random_hex(PUBLIC_RANDOM_HEX / 2))
    }

    /// A new secret key.
    pub fn secret_key(&self) -> String {
        self.format.secret_key(&random_hex(SECRET_HEX / 2))
    }
}
