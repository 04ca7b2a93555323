//! Revocation reason codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a token, session or user's tokens were revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "revocation_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// The user logged out.
    UserLogout,
    /// A refresh token was exchanged for a new one.
    TokenRotation,
    /// The user changed their password.
    PasswordChange,
    /// The user reset their password.
    PasswordReset,
    /// An administrator revoked access.
    AdminRevocation,
    /// Revoked for compliance (account closure, legal hold).
    Compliance,
    /// The owning session was revoked.
    SessionRevoked,
}

impl RevocationReason {
    /// Return the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserLogout => "user_logout",
            Self::TokenRotation => "token_rotation",
            Self::PasswordChange => "password_change",
            Self::PasswordReset => "password_reset",
            Self::AdminRevocation => "admin_revocation",
            Self::Compliance => "compliance",
            Self::SessionRevoked => "session_revoked",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RevocationReason {
    type Err = gatehouse_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_logout" => Ok(Self::UserLogout),
            "token_rotation" => Ok(Self::TokenRotation),
            "password_change" => Ok(Self::PasswordChange),
            "password_reset" => Ok(Self::PasswordReset),
            "admin_revocation" => Ok(Self::AdminRevocation),
            "compliance" => Ok(Self::Compliance),
            "session_revoked" => Ok(Self::SessionRevoked),
            _ => Err(gatehouse_core::AppError::validation(format!(
                "Invalid revocation reason: '{s}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches_display() {
        for reason in [
            RevocationReason::UserLogout,
            RevocationReason::TokenRotation,
            RevocationReason::Compliance,
        ] {
            assert_eq!(reason.as_str().parse::<RevocationReason>().ok(), Some(reason));
        }
        assert!("logout".parse::<RevocationReason>().is_err());
    }
}
