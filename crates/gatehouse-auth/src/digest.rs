//! Opaque random tokens and the SHA-256 digests stored in their place.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a token. Refresh and reset tokens are stored
/// only in this form.
pub fn sha256_hex(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// `bytes` random bytes from the thread-local OS-seeded RNG, as lowercase hex.
pub fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}
