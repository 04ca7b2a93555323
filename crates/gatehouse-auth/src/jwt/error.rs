//! Token verification failures.

use gatehouse_core::error::{AppError, ErrorKind};
use thiserror::Error;

use super::claims::TokenType;

/// Why a bearer token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// `exp` is in the past.
    #[error("token has expired")]
    Expired,
    /// `nbf` is in the future.
    #[error("token is not yet valid")]
    NotYetValid,
    /// Malformed token or claims.
    #[error("invalid token: {0}")]
    Invalid(String),
    /// `iss` does not match the configured issuer.
    #[error("token issuer mismatch")]
    IssuerMismatch,
    /// Signature does not verify with the configured key.
    #[error("token signature mismatch")]
    SignatureMismatch,
    /// A valid token of the wrong type.
    #[error("expected {expected} token, got {actual}")]
    WrongType {
        /// Type the validator requires.
        expected: TokenType,
        /// Type found in the claims.
        actual: TokenType,
    },
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind as Jwt;
        match err.kind() {
            Jwt::ExpiredSignature => Self::Expired,
            Jwt::ImmatureSignature => Self::NotYetValid,
            Jwt::InvalidIssuer => Self::IssuerMismatch,
            Jwt::InvalidSignature => Self::SignatureMismatch,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::with_source(ErrorKind::Unauthorized, err.to_string(), err)
    }
}
