//! Versioned JWT claims with a closed payload per token type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current claims schema version written into `ver`.
pub const CLAIMS_VERSION: u8 = 1;

/// Registered claims shared by every token plus the type-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer.
    pub iss: String,
    /// Subject: the user ID, or the key-pair ID for API-key tokens.
    pub sub: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Not-before (Unix seconds).
    pub nbf: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
    /// Unique token ID (UUIDv7).
    pub jti: Uuid,
    /// Claims schema version.
    pub ver: u8,
    /// Type tag and payload, flattened into the top-level object.
    #[serde(flatten)]
    pub payload: TokenPayload,
}

/// Kind of bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token authenticating a user.
    Access,
    /// Long-lived token exchanged for a new access token.
    Refresh,
    /// Short-lived token minted from a key pair.
    ApiKey,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
            Self::ApiKey => write!(f, "api_key"),
        }
    }
}

/// Per-type payload, tagged by `token_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "token_type", rename_all = "snake_case")]
pub enum TokenPayload {
    /// Access token payload.
    Access(AccessPayload),
    /// Refresh token payload.
    Refresh(RefreshPayload),
    /// API-key token payload.
    ApiKey(ApiKeyPayload),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPayload {
    /// Authenticated user.
    pub user_id: Uuid,
    /// User email at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Organization context the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<Uuid>,
    /// Permission snapshot; authoritative checks go through scope resolution.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Small typed extension map for deployment-specific fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ext: BTreeMap<String, String>,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPayload {
    /// User the refresh token belongs to.
    pub user_id: Uuid,
}

/// Claims carried by an API-key token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyPayload {
    /// Key pair the token was exchanged from.
    pub key_id: Uuid,
    /// Scopes of the key pair at exchange time.
    pub scopes: Vec<String>,
}

/// Caller-supplied fields embedded into an access token.
#[derive(Debug, Clone, Default)]
pub struct AccessClaimsInput {
    /// User email.
    pub email: Option<String>,
    /// Organization context.
    pub org_id: Option<Uuid>,
    /// Permission snapshot.
    pub permissions: Vec<String>,
    /// Extension fields.
    pub ext: BTreeMap<String, String>,
}

impl Claims {
    /// The token type encoded in the payload.
    pub fn token_type(&self) -> TokenType {
        match self.payload {
            TokenPayload::Access(_) => TokenType::Access,
            TokenPayload::Refresh(_) => TokenType::Refresh,
            TokenPayload::ApiKey(_) => TokenType::ApiKey,
        }
    }

    /// The user ID for access and refresh tokens.
    pub fn user_id(&self) -> Option<Uuid> {
        match &self.payload {
            TokenPayload::Access(p) => Some(p.user_id),
            TokenPayload::Refresh(p) => Some(p.user_id),
            TokenPayload::ApiKey(_) => None,
        }
    }

    /// Access payload, if this is an access token.
    pub fn access(&self) -> Option<&AccessPayload> {
        match &self.payload {
            TokenPayload::Access(p) => Some(p),
            _ => None,
        }
    }

    /// API-key payload, if this is an API-key token.
    pub fn api_key(&self) -> Option<&ApiKeyPayload> {
        match &self.payload {
            TokenPayload::ApiKey(p) => Some(p),
            _ => None,
        }
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Issued-at as a timestamp.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_else(Utc::now)
    }

    /// Issue time in Unix milliseconds, read from the UUIDv7 `jti`.
    ///
    /// Falls back to the start of the `iat` second when the `jti` carries
    /// no timestamp inside that second.
    pub fn issued_at_millis(&self) -> i64 {
        let floor = self.iat.saturating_mul(1000);
        self.jti
            .get_timestamp()
            .and_then(|ts| {
                let (secs, nanos) = ts.to_unix();
                let secs = i64::try_from(secs).ok()?;
                Some(secs * 1000 + i64::from(nanos / 1_000_000))
            })
            .filter(|ms| (floor..floor + 1000).contains(ms))
            .unwrap_or(floor)
    }

    /// Remaining lifetime in seconds (0 if expired).
    pub fn remaining_ttl_seconds(&self) -> u64 {
        u64::try_from(self.exp - Utc::now().timestamp()).unwrap_or(0)
    }
}
