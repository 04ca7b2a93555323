//! Delivery of password reset tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use gatehouse_core::result::AppResult;
use gatehouse_entity::user::User;

/// Hands a raw reset token to the user out of band (usually email).
///
/// Failures are logged by the caller and never change the response of a
/// reset request.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    /// Deliver `token` to `user`. The token expires at `expires_at`.
    async fn send_reset(&self, user: &User, token: &str, expires_at: DateTime<Utc>)
    -> AppResult<()>;
}

/// Notifier that only records that a reset was requested. Never logs the token.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingResetNotifier;

#[async_trait]
impl ResetNotifier for LoggingResetNotifier {
    async fn send_reset(
        &self,
        user: &User,
        _token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        info!(user_id = %user.id, expires_at = %expires_at, "Password reset issued");
        Ok(())
    }
}
