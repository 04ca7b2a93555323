//! Key-pair management and exchange.

use tracing::info;
use uuid::Uuid;

use gatehouse_auth::IssueKeyPair;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::credential::KeyPair;

use super::ops;
use super::service::AuthService;
use crate::dto::{ApiKeyToken, CreateKeyPairRequest, KeyPairCreated, validate_request};
use crate::interceptor::OperationContext;

impl AuthService {
    /// Issue a key pair for `user_id`. The secret is in the response only.
    pub async fn create_key_pair(
        &self,
        user_id: Uuid,
        request: CreateKeyPairRequest,
    ) -> AppResult<KeyPairCreated> {
        let ctx = OperationContext::new(ops::CREATE_KEY_PAIR)
            .with_actor(user_id)
            .with_metadata("project_id", request.project_id.to_string());
        self.interceptors
            .run(ctx, self.create_key_pair_inner(user_id, request))
            .await
    }

    async fn create_key_pair_inner(
        &self,
        user_id: Uuid,
        request: CreateKeyPairRequest,
    ) -> AppResult<KeyPairCreated> {
        validate_request(&request)?;
        self.active_user(user_id).await?;

        let issued = self
            .key_pairs
            .issue(IssueKeyPair {
                user_id,
                organization_id: request.organization_id,
                project_id: request.project_id,
                name: request.name,
                scopes: request.scopes,
                rate_limit_per_minute: request.rate_limit_per_minute,
                expires_at: request.expires_at,
            })
            .await?;
        Ok(issued.into())
    }

    /// Deactivate a key pair owned by `user_id`. Tokens already minted from
    /// it stop validating immediately.
    pub async fn revoke_key_pair(&self, user_id: Uuid, key_pair_id: Uuid) -> AppResult<()> {
        let ctx = OperationContext::new(ops::REVOKE_KEY_PAIR)
            .with_actor(user_id)
            .with_metadata("key_pair_id", key_pair_id.to_string());
        self.interceptors
            .run(ctx, async {
                let key_pair = self.owned_key_pair(user_id, key_pair_id).await?;
                if self.key_pairs.deactivate(key_pair.id).await? {
                    info!(key_pair_id = %key_pair.id, user_id = %user_id, "Key pair revoked");
                }
                Ok(())
            })
            .await
    }

    /// Key pairs of `project_id` owned by `user_id`.
    pub async fn list_key_pairs(&self, user_id: Uuid, project_id: Uuid) -> AppResult<Vec<KeyPair>> {
        let key_pairs = self.key_pairs.list_for_project(project_id).await?;
        Ok(key_pairs
            .into_iter()
            .filter(|k| k.user_id == user_id)
            .collect())
    }

    /// Authenticate a public/secret pair. The owning account must still be
    /// active.
    pub async fn validate_key_pair(&self, public_key: &str, secret_key: &str) -> AppResult<KeyPair> {
        self.interceptors
            .run_identified(
                OperationContext::new(ops::VALIDATE_KEY_PAIR),
                self.authenticate_key_pair(public_key, secret_key),
                |k| Some(k.user_id),
            )
            .await
    }

    /// Authenticate a key pair and mint a short-lived API-key token carrying
    /// its scopes.
    pub async fn exchange_key_pair(
        &self,
        public_key: &str,
        secret_key: &str,
    ) -> AppResult<ApiKeyToken> {
        self.interceptors
            .run(OperationContext::new(ops::EXCHANGE_KEY_PAIR), async {
                let key_pair = self.authenticate_key_pair(public_key, secret_key).await?;
                let issued = self
                    .engine
                    .issue_api_key_token(key_pair.id, key_pair.scopes.clone())?;
                Ok(ApiKeyToken {
                    access_token: issued.token,
                    token_type: "Bearer".to_string(),
                    expires_in: u64::try_from((issued.expires_at - issued.issued_at).num_seconds())
                        .unwrap_or(0),
                    scopes: key_pair.scopes,
                })
            })
            .await
    }

    async fn authenticate_key_pair(&self, public_key: &str, secret_key: &str) -> AppResult<KeyPair> {
        let key_pair = self.key_pairs.validate(public_key, secret_key).await?;
        self.active_user(key_pair.user_id).await?;
        Ok(key_pair)
    }

    async fn owned_key_pair(&self, user_id: Uuid, key_pair_id: Uuid) -> AppResult<KeyPair> {
        let key_pair = self.key_pairs.get(key_pair_id).await?;
        if key_pair.user_id != user_id {
            return Err(AppError::not_found("Key pair not found"));
        }
        Ok(key_pair)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;
    use gatehouse_core::error::ErrorKind;
    use gatehouse_entity::revocation::RevocationReason;

    fn request(project_id: Uuid) -> CreateKeyPairRequest {
        CreateKeyPairRequest {
            organization_id: Uuid::now_v7(),
            project_id,
            name: "ci deploy".into(),
            scopes: vec!["files:read".into(), "files:write".into()],
            rate_limit_per_minute: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_created_key_embeds_project_and_validates() {
        let (service, _) = testing::service();
        let owner = testing::register(&service, "keys@example.com").await.user.id;
        let project = Uuid::now_v7();

        let created = service.create_key_pair(owner, request(project)).await.unwrap();
        assert!(created.public_key.contains(&project.simple().to_string()));
        assert_eq!(created.rate_limit_per_minute, 1000);

        let key_pair = service
            .validate_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap();
        assert_eq!(key_pair.id, created.id);

        let mut mutated = created.secret_key.clone();
        let last = mutated.pop().unwrap();
        mutated.push(if last == '0' { '1' } else { '0' });
        let err = service
            .validate_key_pair(&created.public_key, &mutated)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_exchange_and_revoke() {
        let (service, _) = testing::service();
        let owner = testing::register(&service, "exchange@example.com").await.user.id;
        let created = service
            .create_key_pair(owner, request(Uuid::now_v7()))
            .await
            .unwrap();

        let token = service
            .exchange_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap();
        let context = service.validate_token(&token.access_token).await.unwrap();
        assert_eq!(context.api_key_id, Some(created.id));
        assert_eq!(context.user_id, owner);
        assert_eq!(context.scopes, created.scopes);

        service.revoke_key_pair(owner, created.id).await.unwrap();
        let err = service.validate_token(&token.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        let err = service
            .exchange_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_disabled_owner_locks_out_key_pairs() {
        let (service, store) = testing::service();
        let owner = testing::register(&service, "disabled@example.com").await.user.id;
        let created = service
            .create_key_pair(owner, request(Uuid::now_v7()))
            .await
            .unwrap();
        let token = service
            .exchange_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap();

        store.users.set_active(owner, false).await.unwrap();

        let err = service
            .validate_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        let err = service
            .exchange_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        let err = service.validate_token(&token.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_revoke_all_user_tokens_covers_api_key_tokens() {
        let (service, _) = testing::service();
        let owner = testing::register(&service, "compliance@example.com").await.user.id;
        let created = service
            .create_key_pair(owner, request(Uuid::now_v7()))
            .await
            .unwrap();
        let before = service
            .exchange_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap();

        service
            .revoke_all_user_tokens(owner, RevocationReason::Compliance)
            .await
            .unwrap();

        let err = service.validate_token(&before.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let after = service
            .exchange_key_pair(&created.public_key, &created.secret_key)
            .await
            .unwrap();
        service.validate_token(&after.access_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_cannot_revoke_someone_elses_key() {
        let (service, _) = testing::service();
        let owner = testing::register(&service, "mine@example.com").await.user.id;
        let intruder = testing::register(&service, "yours@example.com").await.user.id;
        let project = Uuid::now_v7();
        let created = service.create_key_pair(owner, request(project)).await.unwrap();

        let err = service.revoke_key_pair(intruder, created.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(service.list_key_pairs(intruder, project).await.unwrap().is_empty());
        assert_eq!(service.list_key_pairs(owner, project).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_scope_is_validation_error() {
        let (service, _) = testing::service();
        let owner = testing::register(&service, "scope@example.com").await.user.id;
        let mut bad = request(Uuid::now_v7());
        bad.scopes = vec!["Files Read".into()];

        let err = service.create_key_pair(owner, bad).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
