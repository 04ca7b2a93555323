//! Signing key material loaded once from configuration.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use tracing::info;

use gatehouse_core::config::{SigningAlgorithm, TokenConfig};
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;

/// Shortest accepted HS256 secret.
pub const MIN_HMAC_SECRET_BYTES: usize = 32;

/// Encoding and decoding keys for the configured algorithm.
#[derive(Clone)]
pub struct SigningKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeys")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKeys {
    /// Load keys for the algorithm selected in `config`.
    pub fn load(config: &TokenConfig) -> AppResult<Self> {
        let keys = match config.algorithm {
            SigningAlgorithm::Hs256 => Self::hmac(config)?,
            SigningAlgorithm::Rs256 => Self::rsa(config)?,
        };
        info!(algorithm = %config.algorithm, "Loaded token signing keys");
        Ok(keys)
    }

    fn hmac(config: &TokenConfig) -> AppResult<Self> {
        let secret = config
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::configuration("auth.token.secret is required for HS256"))?;

        if secret.len() < MIN_HMAC_SECRET_BYTES {
            return Err(AppError::configuration(format!(
                "auth.token.secret must be at least {MIN_HMAC_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    fn rsa(config: &TokenConfig) -> AppResult<Self> {
        let private_pem = read_pem(
            "private",
            config.private_key_path.as_deref(),
            config.private_key_base64.as_deref(),
        )?;
        let public_pem = read_pem(
            "public",
            config.public_key_path.as_deref(),
            config.public_key_base64.as_deref(),
        )?;

        let encoding = EncodingKey::from_rsa_pem(&private_pem).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid RSA private key", e)
        })?;
        let decoding = DecodingKey::from_rsa_pem(&public_pem).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid RSA public key", e)
        })?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding,
            decoding,
        })
    }

    /// The JWS algorithm these keys sign with.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key used for signing.
    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    /// Key used for verification.
    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Read a PEM from a file path, falling back to inline base64.
fn read_pem(which: &str, path: Option<&str>, inline: Option<&str>) -> AppResult<Vec<u8>> {
    if let Some(path) = path.filter(|p| !p.is_empty()) {
        return std::fs::read(path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Cannot read RSA {which} key from '{path}'"),
                e,
            )
        });
    }

    if let Some(encoded) = inline.filter(|s| !s.is_empty()) {
        return STANDARD.decode(encoded.trim()).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("RSA {which} key is not valid base64"),
                e,
            )
        });
    }

    Err(AppError::configuration(format!(
        "auth.token.{which}_key_path or auth.token.{which}_key_base64 is required for RS256"
    )))
}
