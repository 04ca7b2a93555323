//! Token engine: the only holder of signing key material.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Header, Validation, decode, encode};
use uuid::Uuid;

use gatehouse_core::config::TokenConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;

use super::claims::{
    AccessClaimsInput, AccessPayload, ApiKeyPayload, CLAIMS_VERSION, Claims, RefreshPayload,
    TokenPayload, TokenType,
};
use super::error::TokenError;
use super::keys::SigningKeys;

/// A freshly signed token and the values callers persist alongside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWS.
    pub token: String,
    /// The token's `jti`.
    pub jti: Uuid,
    /// `iat` as a timestamp.
    pub issued_at: DateTime<Utc>,
    /// `exp` as a timestamp.
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies access, refresh and API-key tokens.
///
/// Verification checks signature, issuer and the `exp`/`nbf` window only;
/// revocation is the caller's concern.
#[derive(Clone)]
pub struct TokenEngine {
    keys: Arc<SigningKeys>,
    header: Header,
    validation: Validation,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
    api_key_ttl: i64,
}

impl std::fmt::Debug for TokenEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEngine")
            .field("algorithm", &self.keys.algorithm())
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenEngine {
    /// Build the engine and prove the key pair by signing and verifying a
    /// probe token. Any failure is a configuration error.
    pub fn new(config: &TokenConfig) -> AppResult<Self> {
        let keys = SigningKeys::load(config)?;

        let mut validation = Validation::new(keys.algorithm());
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = config.leeway_seconds;

        let engine = Self {
            header: Header::new(keys.algorithm()),
            keys: Arc::new(keys),
            validation,
            issuer: config.issuer.clone(),
            access_ttl: to_seconds(config.access_ttl_seconds, "access_ttl_seconds")?,
            refresh_ttl: to_seconds(config.refresh_ttl_seconds, "refresh_ttl_seconds")?,
            api_key_ttl: to_seconds(config.api_key_ttl_seconds, "api_key_ttl_seconds")?,
        };

        engine.probe()?;
        Ok(engine)
    }

    fn probe(&self) -> AppResult<()> {
        let probe = self
            .issue_refresh_token(Uuid::nil())
            .map_err(|e| AppError::configuration(format!("Signing key rejected: {e}")))?;
        self.verify_refresh(&probe.token).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                "Signing and verification keys do not match",
                e,
            )
        })?;
        Ok(())
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl.unsigned_abs()
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.refresh_ttl.unsigned_abs()
    }

    /// Issue an access token for `user_id`.
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        input: AccessClaimsInput,
    ) -> AppResult<IssuedToken> {
        let payload = TokenPayload::Access(AccessPayload {
            user_id,
            email: input.email,
            org_id: input.org_id,
            permissions: input.permissions,
            ext: input.ext,
        });
        self.issue(user_id.to_string(), self.access_ttl, payload)
    }

    /// Issue a refresh token for `user_id`.
    pub fn issue_refresh_token(&self, user_id: Uuid) -> AppResult<IssuedToken> {
        self.issue(
            user_id.to_string(),
            self.refresh_ttl,
            TokenPayload::Refresh(RefreshPayload { user_id }),
        )
    }

    /// Issue a short-lived token for a validated key pair.
    pub fn issue_api_key_token(&self, key_id: Uuid, scopes: Vec<String>) -> AppResult<IssuedToken> {
        self.issue(
            key_id.to_string(),
            self.api_key_ttl,
            TokenPayload::ApiKey(ApiKeyPayload { key_id, scopes }),
        )
    }

    fn issue(&self, subject: String, ttl: i64, payload: TokenPayload) -> AppResult<IssuedToken> {
        // `iat` is taken from the JTI so both agree on the issue second.
        let jti = Uuid::now_v7();
        let iat = jti
            .get_timestamp()
            .and_then(|ts| i64::try_from(ts.to_unix().0).ok())
            .unwrap_or_else(|| Utc::now().timestamp());
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject,
            iat,
            nbf: iat,
            exp: iat + ttl,
            jti,
            ver: CLAIMS_VERSION,
            payload,
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            jti: claims.jti,
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&self.header, claims, self.keys.encoding()).map_err(|e| {
            AppError::with_source(
                ErrorKind::Internal,
                format!("Failed to sign {} token", claims.token_type()),
                e,
            )
        })
    }

    /// Verify signature, issuer and validity window.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, self.keys.decoding(), &self.validation)?;
        if data.claims.ver != CLAIMS_VERSION {
            return Err(TokenError::Invalid(format!(
                "unsupported claims version {}",
                data.claims.ver
            )));
        }
        Ok(data.claims)
    }

    /// Verify and require an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_typed(token, TokenType::Access)
    }

    /// Verify and require a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_typed(token, TokenType::Refresh)
    }

    /// Verify and require an API-key token.
    pub fn verify_api_key(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_typed(token, TokenType::ApiKey)
    }

    fn verify_typed(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        let actual = claims.token_type();
        if actual != expected {
            return Err(TokenError::WrongType { expected, actual });
        }
        Ok(claims)
    }

    /// Decode claims without checking signature or validity window.
    ///
    /// For introspection only; never authorize on the result.
    pub fn extract_unverified(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = self.validation.clone();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.iss = None;
        validation.required_spec_claims.clear();
        let data = decode::<Claims>(token, self.keys.decoding(), &validation)?;
        Ok(data.claims)
    }
}

fn to_seconds(value: u64, field: &str) -> AppResult<i64> {
    match i64::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(AppError::configuration(format!(
            "auth.token.{field} must be a positive number of seconds"
        ))),
    }
}
