//! Password change and reset flows.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_auth::digest::{random_hex, sha256_hex};
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::RevocationReason;
use gatehouse_entity::user::User;

use super::ops;
use super::service::AuthService;
use crate::dto::{ChangePasswordRequest, ResetPasswordRequest, normalize_email, validate_request};
use crate::interceptor::OperationContext;

/// Random bytes in a reset token.
const RESET_TOKEN_BYTES: usize = 32;

const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

impl AuthService {
    /// Change the password of an authenticated user, then end every session
    /// and invalidate every token issued so far.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        let ctx = OperationContext::new(ops::CHANGE_PASSWORD).with_actor(user_id);
        self.interceptors
            .run(ctx, self.change_password_inner(user_id, request))
            .await
    }

    async fn change_password_inner(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        validate_request(&request)?;
        let user = self.active_user(user_id).await?;

        let Some(hash) = user.password_hash.as_deref().filter(|_| user.uses_password()) else {
            return Err(AppError::validation("Account does not use password login"));
        };
        if !self.hasher.verify_async(&request.current_password, hash).await? {
            return Err(AppError::unauthorized("Current password is incorrect"));
        }

        self.validator
            .validate_not_same(&request.current_password, &request.new_password)?;
        self.check_policy(&user, &request.new_password)?;

        let new_hash = self.hasher.hash_async(&request.new_password).await?;
        self.users.update_password(user.id, &new_hash).await?;
        info!(user_id = %user.id, "Password changed");

        self.revoke_after_password_update(user.id, RevocationReason::PasswordChange)
            .await;
        Ok(())
    }

    /// Start a reset for `email`. Succeeds silently for unknown emails and
    /// accounts without a password so the response reveals nothing.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        self.interceptors
            .run(
                OperationContext::new(ops::REQUEST_PASSWORD_RESET),
                self.request_password_reset_inner(email),
            )
            .await
    }

    async fn request_password_reset_inner(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            return Ok(());
        };
        if !user.uses_password() || !user.is_active {
            return Ok(());
        }

        let superseded = self.password_resets.invalidate_for_user(user.id).await?;

        let token = random_hex(RESET_TOKEN_BYTES);
        let expires_at = Utc::now() + self.reset_token_ttl;
        self.password_resets
            .create(user.id, &sha256_hex(&token), expires_at)
            .await?;
        info!(user_id = %user.id, superseded, "Password reset requested");

        if let Err(e) = self.notifier.send_reset(&user, &token, expires_at).await {
            warn!(user_id = %user.id, error = %e, "Failed to deliver password reset");
        }
        Ok(())
    }

    /// Set a new password with a reset token. Each token works once.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AppResult<()> {
        self.interceptors
            .run_identified(
                OperationContext::new(ops::RESET_PASSWORD),
                self.reset_password_inner(request),
                |user_id| Some(*user_id),
            )
            .await
            .map(|_| ())
    }

    async fn reset_password_inner(&self, request: ResetPasswordRequest) -> AppResult<Uuid> {
        validate_request(&request)?;

        let token = self
            .password_resets
            .find_by_hash(&sha256_hex(&request.token))
            .await?
            .filter(|t| t.is_usable(Utc::now()))
            .ok_or_else(|| AppError::unauthorized(INVALID_RESET_TOKEN))?;

        let user = self.active_user(token.user_id).await?;
        self.check_policy(&user, &request.new_password)?;

        if !self.password_resets.mark_used(token.id).await? {
            return Err(AppError::unauthorized(INVALID_RESET_TOKEN));
        }

        let new_hash = self.hasher.hash_async(&request.new_password).await?;
        self.users.update_password(user.id, &new_hash).await?;
        info!(user_id = %user.id, "Password reset completed");

        self.revoke_after_password_update(user.id, RevocationReason::PasswordReset)
            .await;
        Ok(user.id)
    }

    fn check_policy(&self, user: &User, password: &str) -> AppResult<()> {
        let mut inputs = vec![user.email.as_str()];
        inputs.extend(user.first_name.as_deref());
        inputs.extend(user.last_name.as_deref());
        self.validator.validate(password, &inputs)
    }

    /// The password is already updated; session cleanup failures are logged.
    async fn revoke_after_password_update(&self, user_id: Uuid, reason: RevocationReason) {
        if let Err(e) = self.sessions.revoke_all(user_id, reason).await {
            warn!(user_id = %user_id, error = %e, "Failed to revoke sessions after password update");
        }
        if let Err(e) = self
            .revocations
            .blacklist_all_user_tokens(user_id, reason)
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to record user cutoff after password update");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::DateTime;

    use super::super::testing::{self, PASSWORD};
    use super::*;
    use crate::dto::LoginRequest;
    use crate::notifier::ResetNotifier;
    use gatehouse_core::error::ErrorKind;
    use gatehouse_entity::session::DeviceInfo;

    const NEW_PASSWORD: &str = "violet-Harbor-17-slowly";

    #[derive(Default)]
    struct CapturingNotifier {
        tokens: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResetNotifier for CapturingNotifier {
        async fn send_reset(
            &self,
            _user: &User,
            token: &str,
            _expires_at: DateTime<Utc>,
        ) -> AppResult<()> {
            self.tokens.lock().unwrap().push(token.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_change_password_revokes_existing_sessions() {
        let (service, store) = testing::service();
        let login = testing::register(&service, "change@example.com").await;

        service
            .change_password(
                login.user.id,
                ChangePasswordRequest {
                    current_password: PASSWORD.into(),
                    new_password: NEW_PASSWORD.into(),
                },
            )
            .await
            .unwrap();

        let err = service
            .validate_token(&login.tokens.access_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert!(store
            .sessions
            .find_active_by_user(login.user.id)
            .await
            .unwrap()
            .is_empty());

        let old = service
            .login(
                LoginRequest {
                    email: "change@example.com".into(),
                    password: PASSWORD.into(),
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(old.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let (service, _) = testing::service();
        let login = testing::register(&service, "guard@example.com").await;

        let err = service
            .change_password(
                login.user.id,
                ChangePasswordRequest {
                    current_password: "wrong".into(),
                    new_password: NEW_PASSWORD.into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let same = service
            .change_password(
                login.user.id,
                ChangePasswordRequest {
                    current_password: PASSWORD.into(),
                    new_password: PASSWORD.into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(same.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_reset_token_works_once() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (service, _) = testing::service();
        let service = service.with_notifier(notifier.clone());
        testing::register(&service, "reset@example.com").await;

        service.request_password_reset("Reset@Example.com").await.unwrap();
        let token = notifier.tokens.lock().unwrap().pop().unwrap();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);

        service
            .reset_password(ResetPasswordRequest {
                token: token.clone(),
                new_password: NEW_PASSWORD.into(),
            })
            .await
            .unwrap();

        let again = service
            .reset_password(ResetPasswordRequest {
                token,
                new_password: "another-Granite-88-softly".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(again.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_newer_reset_supersedes_older() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (service, _) = testing::service();
        let service = service.with_notifier(notifier.clone());
        testing::register(&service, "twice@example.com").await;

        service.request_password_reset("twice@example.com").await.unwrap();
        service.request_password_reset("twice@example.com").await.unwrap();
        let (first, second) = {
            let tokens = notifier.tokens.lock().unwrap();
            (tokens[0].clone(), tokens[1].clone())
        };

        let err = service
            .reset_password(ResetPasswordRequest {
                token: first,
                new_password: NEW_PASSWORD.into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        service
            .reset_password(ResetPasswordRequest {
                token: second,
                new_password: NEW_PASSWORD.into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_email_reset_is_silent() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (service, _) = testing::service();
        let service = service.with_notifier(notifier.clone());

        service.request_password_reset("ghost@example.com").await.unwrap();
        assert!(notifier.tokens.lock().unwrap().is_empty());
    }
}
