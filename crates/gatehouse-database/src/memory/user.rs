//! In-memory user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::user::{CreateUser, User};

use crate::repository::UserRepository;

/// `DashMap`-backed [`UserRepository`].
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<Uuid, User>,
    by_email: DashMap<String, Uuid>,
}

impl MemoryUserRepository {
    fn update<F>(&self, id: Uuid, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut User),
    {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        apply(&mut user);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let id = self.by_email.get(&email.to_lowercase()).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn find_by_oauth_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| {
                u.oauth_provider.as_deref() == Some(provider)
                    && u.oauth_provider_id.as_deref() == Some(provider_id)
            })
            .map(|u| u.clone()))
    }

    async fn create(&self, mut data: CreateUser) -> AppResult<User> {
        data.email = data.email.to_lowercase();
        let id = Uuid::now_v7();
        match self.by_email.entry(data.email.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "User with email '{}' already exists",
                data.email
            ))),
            Entry::Vacant(slot) => {
                let user = data.into_user(id, Utc::now());
                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        self.update(id, |user| {
            user.password_hash = Some(password_hash.to_string());
            user.updated_at = Utc::now();
        })
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.update(id, |user| user.last_login_at = Some(at))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<()> {
        self.update(id, |user| {
            user.is_active = active;
            user.updated_at = Utc::now();
        })
    }
}
