//! Integration tests for key-pair credentials.

mod helpers;

use chrono::{Duration, Utc};
use uuid::Uuid;

use gatehouse_auth::TokenType;
use gatehouse_core::error::ErrorKind;
use gatehouse_service::dto::CreateKeyPairRequest;

use helpers::TestApp;

fn key_request(project_id: Uuid, scopes: &[&str]) -> CreateKeyPairRequest {
    CreateKeyPairRequest {
        organization_id: Uuid::now_v7(),
        project_id,
        name: "deploy bot".to_string(),
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        rate_limit_per_minute: Some(120),
        expires_at: None,
    }
}

#[tokio::test]
async fn test_exchange_yields_scoped_api_key_token() {
    let app = TestApp::new();
    let owner = app.register("keys@example.com").await.user.id;
    let project = Uuid::now_v7();

    let created = app
        .service
        .create_key_pair(owner, key_request(project, &["builds:read", "builds:deploy"]))
        .await
        .unwrap();
    assert_eq!(created.rate_limit_per_minute, 120);

    let token = app
        .service
        .exchange_key_pair(&created.public_key, &created.secret_key)
        .await
        .unwrap();
    assert_eq!(token.token_type, "Bearer");
    assert!(token.expires_in > 0);

    let context = app.service.validate_token(&token.access_token).await.unwrap();
    assert_eq!(context.token_type, TokenType::ApiKey);
    assert_eq!(context.api_key_id, Some(created.id));
    assert_eq!(context.project_id, Some(project));
    assert!(context.scopes.iter().any(|s| s == "builds:deploy"));
}

#[tokio::test]
async fn test_secret_is_never_stored() {
    let app = TestApp::new();
    let owner = app.register("hash@example.com").await.user.id;
    let created = app
        .service
        .create_key_pair(owner, key_request(Uuid::now_v7(), &["files:read"]))
        .await
        .unwrap();

    let stored = app
        .store
        .key_pairs
        .find_by_id(created.id)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.secret_hash, created.secret_key);
    assert!(!stored.secret_hash.contains(&created.secret_key));
}

#[tokio::test]
async fn test_expired_key_pair_is_rejected() {
    let app = TestApp::new();
    let owner = app.register("expiry@example.com").await.user.id;
    let mut request = key_request(Uuid::now_v7(), &["files:read"]);
    request.expires_at = Some(Utc::now() + Duration::seconds(1));
    let created = app.service.create_key_pair(owner, request).await.unwrap();

    app.service
        .validate_key_pair(&created.public_key, &created.secret_key)
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    let err = app
        .service
        .validate_key_pair(&created.public_key, &created.secret_key)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_last_used_is_stamped_in_background() {
    let app = TestApp::new();
    let owner = app.register("touch@example.com").await.user.id;
    let created = app
        .service
        .create_key_pair(owner, key_request(Uuid::now_v7(), &["files:read"]))
        .await
        .unwrap();

    app.service
        .validate_key_pair(&created.public_key, &created.secret_key)
        .await
        .unwrap();

    // Dropping the service closes the queue; the worker drains it first.
    let TestApp {
        service,
        store,
        last_used,
        ..
    } = app;
    drop(service);
    last_used.shutdown().await;

    let stored = store.key_pairs.find_by_id(created.id).await.unwrap().unwrap();
    assert!(stored.last_used_at.is_some());
}
