//! Integration tests for the login, refresh and logout flow.

mod helpers;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gatehouse_auth::TokenType;
use gatehouse_core::error::ErrorKind;
use gatehouse_core::events::{AuditEvent, AuditOutcome};
use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::RevocationReason;
use gatehouse_service::dto::LoginRequest;
use gatehouse_service::{AuditInterceptor, AuditSink, InterceptorChain, ops};

use helpers::TestApp;

#[tokio::test]
async fn test_token_lifecycle() {
    let app = TestApp::new();
    let registered = app.register("lifecycle@example.com").await;

    let context = app
        .service
        .validate_token(&registered.tokens.access_token)
        .await
        .unwrap();
    assert_eq!(context.user_id, registered.user.id);
    assert_eq!(context.token_type, TokenType::Access);
    assert!(!context.is_api_key());

    let rotated = app
        .service
        .refresh(&registered.tokens.refresh_token)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, registered.tokens.refresh_token);

    // The first pair is retired by the refresh.
    assert!(app.service.refresh(&registered.tokens.refresh_token).await.is_err());
    assert!(
        app.service
            .validate_token(&registered.tokens.access_token)
            .await
            .is_err()
    );

    let current = app.service.validate_token(&rotated.access_token).await.unwrap();
    app.service
        .logout(current.jti, current.user_id)
        .await
        .unwrap();

    let err = app
        .service
        .validate_token(&rotated.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(app.service.refresh(&rotated.refresh_token).await.is_err());

    // Logging out twice is harmless.
    app.service
        .logout(current.jti, current.user_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_tampered_and_foreign_tokens_are_rejected() {
    let app = TestApp::new();
    let registered = app.register("tamper@example.com").await;

    let mut parts: Vec<String> = registered
        .tokens
        .access_token
        .split('.')
        .map(str::to_string)
        .collect();
    parts[2] = parts[2].chars().rev().collect();
    let err = app.service.validate_token(&parts.join(".")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let mut other_config = helpers::test_config();
    other_config.auth.token.secret = Some("a-different-secret-0123456789abcdef".to_string());
    let other = TestApp::with_config(other_config);
    let err = other
        .service
        .validate_token(&registered.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_admin_revocation_ends_every_device() {
    let app = TestApp::new();
    let laptop = app.register("devices@example.com").await;
    let phone = app.login("devices@example.com", "phone").await;
    assert_eq!(app.service.list_sessions(laptop.user.id).await.unwrap().len(), 2);

    let revoked = app
        .service
        .revoke_all_user_tokens(laptop.user.id, RevocationReason::AdminRevocation)
        .await
        .unwrap();
    assert_eq!(revoked, 2);

    for tokens in [&laptop.tokens, &phone.tokens] {
        assert!(app.service.validate_token(&tokens.access_token).await.is_err());
        assert!(app.service.refresh(&tokens.refresh_token).await.is_err());
    }
    assert!(app.service.list_sessions(laptop.user.id).await.unwrap().is_empty());

    let again = app.login("devices@example.com", "laptop").await;
    app.service.validate_token(&again.tokens.access_token).await.unwrap();
    app.service.refresh(&again.tokens.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = TestApp::new();
    app.register("known@example.com").await;

    let wrong_password = app
        .service
        .login(
            LoginRequest {
                email: "known@example.com".to_string(),
                password: "not-the-password".to_string(),
            },
            Default::default(),
        )
        .await
        .unwrap_err();
    let unknown_user = app
        .service
        .login(
            LoginRequest {
                email: "unknown@example.com".to_string(),
                password: helpers::PASSWORD.to_string(),
            },
            Default::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(wrong_password.kind, ErrorKind::Unauthorized);
    assert_eq!(unknown_user.kind, ErrorKind::Unauthorized);
    assert_eq!(wrong_password.message, unknown_user.message);
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn record(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[tokio::test]
async fn test_operations_are_audited() {
    let sink = Arc::new(RecordingSink::default());
    let mut app = TestApp::new();
    app.service = app.service.with_interceptors(
        InterceptorChain::default().register_global(Arc::new(AuditInterceptor::new(sink.clone()))),
    );

    let registered = app.register("audit@example.com").await;
    let _ = app.service.validate_token("not-a-token").await;

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 2);

    assert_eq!(events[0].operation, ops::REGISTER);
    assert_eq!(events[0].actor_id, Some(registered.user.id));
    assert!(events[0].outcome.is_success());

    assert_eq!(events[1].operation, ops::VALIDATE_TOKEN);
    assert_eq!(events[1].actor_id, None);
    assert!(matches!(
        events[1].outcome,
        AuditOutcome::Failure {
            kind: ErrorKind::Unauthorized,
            ..
        }
    ));
}
