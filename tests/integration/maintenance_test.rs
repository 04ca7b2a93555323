//! Integration tests for the maintenance sweeps.

mod helpers;

use std::time::Duration;

use gatehouse_worker::MaintenanceTasks;

use helpers::TestApp;

#[tokio::test]
async fn test_sweeps_remove_expired_state() {
    let mut config = helpers::test_config();
    config.auth.token.access_ttl_seconds = 1;
    config.auth.token.refresh_ttl_seconds = 2;
    let app = TestApp::with_config(config);
    let tasks = MaintenanceTasks::new(&app.store, &app.config.session).unwrap();

    let registered = app.register("sweep@example.com").await;
    let context = app
        .service
        .validate_token(&registered.tokens.access_token)
        .await
        .unwrap();
    app.service.logout(context.jti, context.user_id).await.unwrap();
    app.service
        .request_password_reset("sweep@example.com")
        .await
        .unwrap();

    // Nothing has expired yet.
    assert_eq!(tasks.sweep_sessions().await.unwrap(), 0);
    assert_eq!(tasks.sweep_revocations().await.unwrap(), 0);
    assert!(app.store.blacklist.find(context.jti).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(tasks.sweep_sessions().await.unwrap(), 1);
    assert_eq!(tasks.sweep_revocations().await.unwrap(), 1);
    assert!(app.store.blacklist.find(context.jti).await.unwrap().is_none());
    assert!(app.service.list_sessions(registered.user.id).await.unwrap().is_empty());

    // The reset token lives for an hour and survives the sweep.
    assert_eq!(tasks.sweep_reset_tokens().await.unwrap(), 0);
}
