//! Registration, login and token generation.

use chrono::Utc;
use tracing::{info, warn};

use gatehouse_auth::digest::sha256_hex;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::session::{DeviceInfo, TokenPair};
use gatehouse_entity::user::{AuthMethod, CreateUser, User};

use super::ops;
use super::service::{AuthService, INVALID_CREDENTIALS};
use crate::dto::{LoginRequest, LoginResult, RegisterRequest, normalize_email, validate_request};
use crate::interceptor::OperationContext;

fn device_context(operation: &'static str, device: &DeviceInfo) -> OperationContext {
    OperationContext::new(operation)
        .with_optional("ip_address", device.ip_address.as_deref())
        .with_optional("user_agent", device.user_agent.as_deref())
}

impl AuthService {
    /// Create a password account and log it in.
    pub async fn register(
        &self,
        request: RegisterRequest,
        device: DeviceInfo,
    ) -> AppResult<LoginResult> {
        let ctx = device_context(ops::REGISTER, &device);
        self.interceptors
            .run_identified(ctx, self.register_inner(request, device), |r| {
                Some(r.user.id)
            })
            .await
    }

    async fn register_inner(
        &self,
        request: RegisterRequest,
        device: DeviceInfo,
    ) -> AppResult<LoginResult> {
        validate_request(&request)?;
        let email = normalize_email(&request.email);

        let mut inputs = vec![email.as_str()];
        inputs.extend(request.first_name.as_deref());
        inputs.extend(request.last_name.as_deref());
        self.validator.validate(&request.password, &inputs)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email is already registered"));
        }

        let password_hash = self.hasher.hash_async(&request.password).await?;
        let user = self
            .users
            .create(CreateUser {
                email,
                password_hash: Some(password_hash),
                first_name: request.first_name,
                last_name: request.last_name,
                auth_method: AuthMethod::Password,
                oauth_provider: None,
                oauth_provider_id: None,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        self.generate_tokens_for_user(&user, device).await
    }

    /// Authenticate with email and password.
    ///
    /// Unknown emails, OAuth-only accounts and wrong passwords all fail
    /// with the same `Unauthorized`; a disabled account with the right
    /// password is `Forbidden`.
    pub async fn login(&self, request: LoginRequest, device: DeviceInfo) -> AppResult<LoginResult> {
        let ctx = device_context(ops::LOGIN, &device);
        self.interceptors
            .run_identified(ctx, self.login_inner(request, device), |r| Some(r.user.id))
            .await
    }

    async fn login_inner(&self, request: LoginRequest, device: DeviceInfo) -> AppResult<LoginResult> {
        validate_request(&request)?;
        let email = normalize_email(&request.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.hasher.dummy_verify_async(&request.password).await;
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        let Some(hash) = user.password_hash.as_deref().filter(|_| user.uses_password()) else {
            self.hasher.dummy_verify_async(&request.password).await;
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !self.hasher.verify_async(&request.password, hash).await? {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        if !user.is_active {
            return Err(AppError::forbidden("Account is disabled"));
        }

        let result = self.generate_tokens_for_user(&user, device).await?;

        if let Err(e) = self.users.update_last_login(user.id, Utc::now()).await {
            warn!(user_id = %user.id, error = %e, "Failed to record last login");
        }

        info!(user_id = %user.id, session_id = %result.session.id, "Login successful");
        Ok(result)
    }

    /// Mint an access/refresh pair for an already authenticated user and
    /// persist the session that binds them.
    pub async fn generate_tokens_for_user(
        &self,
        user: &User,
        device: DeviceInfo,
    ) -> AppResult<LoginResult> {
        if !user.is_active {
            return Err(AppError::forbidden("Account is disabled"));
        }

        let access = self
            .engine
            .issue_access_token(user.id, Self::access_claims(user))?;
        let refresh = self.engine.issue_refresh_token(user.id)?;

        let session = self
            .sessions
            .create(
                user.id,
                sha256_hex(&refresh.token),
                access.jti,
                access.expires_at,
                refresh.expires_at,
                device,
            )
            .await?;

        Ok(LoginResult {
            tokens: TokenPair::bearer(
                access.token,
                refresh.token,
                self.engine.access_ttl_seconds(),
            ),
            session,
            user: user.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{self, PASSWORD};
    use super::*;
    use gatehouse_core::error::ErrorKind;

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, store) = testing::service();
        let registered = testing::register(&service, "Ada@Example.com").await;
        assert_eq!(registered.user.email, "ada@example.com");
        assert_eq!(registered.tokens.token_type, "Bearer");

        let result = service
            .login(login_request("ada@example.com", PASSWORD), DeviceInfo::default())
            .await
            .unwrap();
        assert_ne!(result.session.id, registered.session.id);
        assert_eq!(
            result.session.refresh_token_hash,
            sha256_hex(&result.tokens.refresh_token)
        );

        let user = store.users.find_by_id(result.user.id).await.unwrap().unwrap();
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let (service, _) = testing::service();
        testing::register(&service, "dup@example.com").await;

        let err = service
            .register(
                RegisterRequest {
                    email: "DUP@example.com".into(),
                    password: PASSWORD.into(),
                    first_name: None,
                    last_name: None,
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_weak_password_rejected_on_register() {
        let (service, _) = testing::service();
        let err = service
            .register(
                RegisterRequest {
                    email: "weak@example.com".into(),
                    password: "password".into(),
                    first_name: None,
                    last_name: None,
                },
                DeviceInfo::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let (service, _) = testing::service();
        testing::register(&service, "known@example.com").await;

        let unknown = service
            .login(login_request("nobody@example.com", PASSWORD), DeviceInfo::default())
            .await
            .unwrap_err();
        let wrong = service
            .login(login_request("known@example.com", "not-it"), DeviceInfo::default())
            .await
            .unwrap_err();

        assert_eq!(unknown.kind, ErrorKind::Unauthorized);
        assert_eq!(wrong.kind, ErrorKind::Unauthorized);
        assert_eq!(unknown.message, wrong.message);
    }

    #[tokio::test]
    async fn test_inactive_account_is_forbidden() {
        let (service, store) = testing::service();
        let registered = testing::register(&service, "off@example.com").await;
        store.users.set_active(registered.user.id, false).await.unwrap();

        let err = service
            .login(login_request("off@example.com", PASSWORD), DeviceInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_oauth_account_cannot_password_login() {
        let (service, store) = testing::service();
        store
            .users
            .create(CreateUser {
                email: "oauth@example.com".into(),
                password_hash: None,
                first_name: None,
                last_name: None,
                auth_method: AuthMethod::OAuth,
                oauth_provider: Some("github".into()),
                oauth_provider_id: Some("42".into()),
            })
            .await
            .unwrap();

        let err = service
            .login(login_request("oauth@example.com", PASSWORD), DeviceInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, INVALID_CREDENTIALS);
    }
}
