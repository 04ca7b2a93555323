//! Bearer token issuance and verification.

pub mod claims;
pub mod engine;
pub mod error;
pub mod keys;

pub use claims::{
    AccessClaimsInput, AccessPayload, ApiKeyPayload, CLAIMS_VERSION, Claims, RefreshPayload,
    TokenPayload, TokenType,
};
pub use engine::{IssuedToken, TokenEngine};
pub use error::TokenError;
pub use keys::SigningKeys;
