//! Cache key builders for every Gatehouse cache entry.

use uuid::Uuid;

/// Prefix applied to all Gatehouse cache keys.
const PREFIX: &str = "gh";

/// OAuth CSRF state issued by `begin_oauth`.
pub fn oauth_state(state: &str) -> String {
    format!("{PREFIX}:oauth:state:{state}")
}

/// One-time code under which minted tokens wait for the client.
pub fn oauth_handoff(code: &str) -> String {
    format!("{PREFIX}:oauth:handoff:{code}")
}

/// Positive blacklist hit for a JTI.
pub fn revoked_jti(jti: Uuid) -> String {
    format!("{PREFIX}:revoked:jti:{jti}")
}

/// Cached issued-at cutoff of a user (Unix milliseconds).
pub fn user_cutoff(user_id: Uuid) -> String {
    format!("{PREFIX}:revoked:user_ms:{user_id}")
}
