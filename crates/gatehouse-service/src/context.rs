//! Authenticated caller context produced by token validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatehouse_auth::jwt::Claims;
use gatehouse_auth::TokenType;
use gatehouse_entity::credential::KeyPair;

/// Who is calling, resolved from a validated bearer token.
///
/// Returned by `AuthService::validate_token` and passed by the transport
/// layer into every downstream operation. Scopes here are the snapshot in
/// the token (or the key pair's current scopes); authoritative permission
/// checks go through scope resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// The user acting, or the owner of the key pair.
    pub user_id: Uuid,
    /// Set when the caller authenticated with a key-pair token.
    pub api_key_id: Option<Uuid>,
    /// JTI of the presented token.
    pub jti: Uuid,
    /// Kind of token presented.
    pub token_type: TokenType,
    /// Organization context carried by the token or key pair.
    pub organization_id: Option<Uuid>,
    /// Project of the key pair.
    pub project_id: Option<Uuid>,
    /// Scope snapshot.
    pub scopes: Vec<String>,
    /// When the presented token expires.
    pub expires_at: DateTime<Utc>,
}

impl AuthContext {
    /// Context for a validated access token.
    pub(crate) fn for_user(user_id: Uuid, claims: &Claims) -> Self {
        let access = claims.access();
        Self {
            user_id,
            api_key_id: None,
            jti: claims.jti,
            token_type: TokenType::Access,
            organization_id: access.and_then(|a| a.org_id),
            project_id: None,
            scopes: access.map(|a| a.permissions.clone()).unwrap_or_default(),
            expires_at: claims.expires_at(),
        }
    }

    /// Context for a validated API-key token of `key_pair`.
    pub(crate) fn for_key_pair(key_pair: &KeyPair, claims: &Claims) -> Self {
        Self {
            user_id: key_pair.user_id,
            api_key_id: Some(key_pair.id),
            jti: claims.jti,
            token_type: TokenType::ApiKey,
            organization_id: Some(key_pair.organization_id),
            project_id: Some(key_pair.project_id),
            scopes: key_pair.scopes.clone(),
            expires_at: claims.expires_at(),
        }
    }

    /// Whether the caller is a machine credential.
    pub fn is_api_key(&self) -> bool {
        self.api_key_id.is_some()
    }
}
