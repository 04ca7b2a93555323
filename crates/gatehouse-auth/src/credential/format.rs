//! Public/secret key layout and parsing.
//!
//! Public key: `<public prefix><project uuid, 32 hex><_><32 hex>`.
//! Secret key: `<secret prefix><40 hex>`.

use thiserror::Error;
use uuid::Uuid;

use gatehouse_core::config::CredentialConfig;

/// Hex characters of the random suffix of a public key.
pub const PUBLIC_RANDOM_HEX: usize = 32;
/// Hex characters of the embedded project id.
pub const PROJECT_ID_HEX: usize = 32;
/// Hex characters of a secret key body.
pub const SECRET_HEX: usize = 40;

/// Why a presented key is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFormatError {
    /// Missing or wrong prefix.
    #[error("missing '{0}' prefix")]
    Prefix(String),
    /// Total length differs from the fixed layout.
    #[error("expected {expected} characters, got {actual}")]
    Length {
        /// Required length.
        expected: usize,
        /// Presented length.
        actual: usize,
    },
    /// The embedded project id is not a UUID.
    #[error("malformed project id")]
    ProjectId,
    /// A random part contains non-hex characters or a bad separator.
    #[error("malformed key body")]
    Body,
}

/// Key layout derived from configuration.
#[derive(Debug, Clone)]
pub struct KeyFormat {
    public_prefix: String,
    secret_prefix: String,
}

impl KeyFormat {
    /// Layout using the configured prefixes.
    pub fn new(config: &CredentialConfig) -> Self {
        Self {
            public_prefix: config.public_key_prefix.clone(),
            secret_prefix: config.secret_key_prefix.clone(),
        }
    }

    /// Public key prefix.
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Secret key prefix.
    pub fn secret_prefix(&self) -> &str {
        &self.secret_prefix
    }

    /// Exact length of every public key.
    pub fn public_key_len(&self) -> usize {
        self.public_prefix.len() + PROJECT_ID_HEX + 1 + PUBLIC_RANDOM_HEX
    }

    /// Exact length of every secret key.
    pub fn secret_key_len(&self) -> usize {
        self.secret_prefix.len() + SECRET_HEX
    }

    /// Assemble a public key.
    pub fn public_key(&self, project_id: Uuid, random_hex: &str) -> String {
        format!("{}{}_{random_hex}", self.public_prefix, project_id.simple())
    }

    /// Assemble a secret key.
    pub fn secret_key(&self, random_hex: &str) -> String {
        format!("{}{random_hex}", self.secret_prefix)
    }

    /// Validate a public key and return the embedded project id.
    pub fn parse_public_key(&self, key: &str) -> Result<Uuid, KeyFormatError> {
        let body = key
            .strip_prefix(self.public_prefix.as_str())
            .ok_or_else(|| KeyFormatError::Prefix(self.public_prefix.clone()))?;

        if key.len() != self.public_key_len() {
            return Err(KeyFormatError::Length {
                expected: self.public_key_len(),
                actual: key.len(),
            });
        }
        if !body.is_ascii() {
            return Err(KeyFormatError::Body);
        }

        let (project, rest) = body.split_at(PROJECT_ID_HEX);
        if !is_lower_hex(project) {
            return Err(KeyFormatError::ProjectId);
        }
        let project_id = Uuid::try_parse(project).map_err(|_| KeyFormatError::ProjectId)?;

        match rest.strip_prefix('_') {
            Some(random) if is_lower_hex(random) => Ok(project_id),
            _ => Err(KeyFormatError::Body),
        }
    }

    /// Validate the shape of a secret key.
    pub fn validate_secret_format(&self, key: &str) -> Result<(), KeyFormatError> {
        let body = key
            .strip_prefix(self.secret_prefix.as_str())
            .ok_or_else(|| KeyFormatError::Prefix(self.secret_prefix.clone()))?;

        if key.len() != self.secret_key_len() {
            return Err(KeyFormatError::Length {
                expected: self.secret_key_len(),
                actual: key.len(),
            });
        }
        if !is_lower_hex(body) {
            return Err(KeyFormatError::Body);
        }
        Ok(())
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> KeyFormat {
        KeyFormat::new(&CredentialConfig::default())
    }

    #[test]
    fn test_public_key_round_trip() {
        let f = format();
        let project = Uuid::now_v7();
        let key = f.public_key(project, &"a".repeat(PUBLIC_RANDOM_HEX));
        assert_eq!(key.len(), f.public_key_len());
        assert!(key.starts_with("pk_"));
        assert_eq!(f.parse_public_key(&key).unwrap(), project);
    }

    #[test]
    fn test_public_key_rejections() {
        let f = format();
        let good = f.public_key(Uuid::now_v7(), &"b".repeat(PUBLIC_RANDOM_HEX));

        assert!(matches!(
            f.parse_public_key(&good.replacen("pk_", "xk_", 1)),
            Err(KeyFormatError::Prefix(_))
        ));
        assert!(matches!(
            f.parse_public_key(&good[..good.len() - 1]),
            Err(KeyFormatError::Length { .. })
        ));

        let mut bad_project = good.clone();
        bad_project.replace_range(3..4, "z");
        assert_eq!(f.parse_public_key(&bad_project), Err(KeyFormatError::ProjectId));

        let mut bad_separator = good.clone();
        bad_separator.replace_range(35..36, "-");
        assert_eq!(f.parse_public_key(&bad_separator), Err(KeyFormatError::Body));

        let mut bad_random = good;
        let last = bad_random.len() - 1;
        bad_random.replace_range(last.., "G");
        assert_eq!(f.parse_public_key(&bad_random), Err(KeyFormatError::Body));
    }

    #[test]
    fn test_secret_format() {
        let f = format();
        let secret = f.secret_key(&"0123456789".repeat(4));
        assert!(f.validate_secret_format(&secret).is_ok());
        assert!(f.validate_secret_format("sk_abc").is_err());
        assert!(f.validate_secret_format(&secret.replace("sk_", "pk_")).is_err());
        assert_eq!(
            f.validate_secret_format(&format!("sk_{}", "Z".repeat(SECRET_HEX))),
            Err(KeyFormatError::Body)
        );
    }
}
