//! Argon2id hashing and verification for passwords and key-pair secrets.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use gatehouse_core::config::{CredentialConfig, PasswordConfig};
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;

/// Argon2id hasher with configured cost parameters.
///
/// Verification reads the parameters from the stored PHC string, so hashes
/// created under older costs keep verifying after a cost change.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of a random value, verified against when there is no real hash
    /// so that unknown accounts cost the same as wrong passwords.
    dummy_hash: String,
}

impl PasswordHasher {
    /// Create a hasher with explicit argon2 costs.
    pub fn new(memory_cost_kib: u32, time_cost: u32, parallelism: u32) -> AppResult<Self> {
        let params = Params::new(memory_cost_kib, time_cost, parallelism, None).map_err(|e| {
            AppError::configuration(format!("Invalid argon2 parameters: {e}"))
        })?;

        let mut hasher = Self {
            params,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(&uuid::Uuid::new_v4().to_string())?;
        Ok(hasher)
    }

    /// Hasher for user passwords.
    pub fn for_passwords(config: &PasswordConfig) -> AppResult<Self> {
        Self::new(config.memory_cost_kib, config.time_cost, config.parallelism)
    }

    /// Hasher for key-pair secrets.
    pub fn for_secrets(config: &CredentialConfig) -> AppResult<Self> {
        Self::new(config.memory_cost_kib, config.time_cost, config.parallelism)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext value with a random salt into a PHC string.
    pub fn hash(&self, plaintext: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext value against a stored PHC string.
    ///
    /// Returns `Ok(false)` on mismatch; an unparseable hash is an internal error.
    pub fn verify(&self, plaintext: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            AppError::new(ErrorKind::Internal, format!("Invalid password hash format: {e}"))
        })?;

        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }

    /// Burn one verification against the dummy hash. Always "fails".
    pub fn dummy_verify(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.dummy_hash);
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_async(&self, plaintext: &str) -> AppResult<String> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        run_blocking(move || hasher.hash(&plaintext)).await?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_async(&self, plaintext: &str, hash: &str) -> AppResult<bool> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        run_blocking(move || hasher.verify(&plaintext, &hash)).await?
    }

    /// [`dummy_verify`](Self::dummy_verify) on the blocking thread pool.
    pub async fn dummy_verify_async(&self, plaintext: &str) {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        if let Err(e) = run_blocking(move || hasher.dummy_verify(&plaintext)).await {
            tracing::warn!(error = %e, "Dummy verification task failed");
        }
    }
}

async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Hashing task panicked", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::new(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = cheap();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_old_costs_still_verify() {
        let old = cheap();
        let hash = old.hash("secret").unwrap();
        let new = PasswordHasher::new(2048, 2, 1).unwrap();
        assert!(new.verify("secret", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_internal_error() {
        let err = cheap().verify("x", "not-a-phc-string").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_async_variants_match_sync() {
        let hasher = cheap();
        let hash = hasher.hash_async("correct horse").await.unwrap();
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(hasher.verify_async("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify_async("wrong horse", &hash).await.unwrap());

        let err = hasher.verify_async("x", "not-a-phc-string").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        hasher.dummy_verify_async("anything").await;
    }

    #[test]
    fn test_invalid_params() {
        let err = PasswordHasher::new(1, 0, 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
