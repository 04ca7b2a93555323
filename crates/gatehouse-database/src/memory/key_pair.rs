//! In-memory key-pair repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::credential::{CreateKeyPair, KeyPair, KeyPairChanges};

use crate::repository::KeyPairRepository;

/// `DashMap`-backed [`KeyPairRepository`].
#[derive(Debug, Default)]
pub struct MemoryKeyPairRepository {
    key_pairs: DashMap<Uuid, KeyPair>,
    by_public_key: DashMap<String, Uuid>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Key pair {id} not found"))
}

#[async_trait]
impl KeyPairRepository for MemoryKeyPairRepository {
    async fn create(&self, data: CreateKeyPair) -> AppResult<KeyPair> {
        let id = Uuid::now_v7();
        match self.by_public_key.entry(data.public_key.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict("Public key already exists")),
            Entry::Vacant(slot) => {
                let key_pair = data.into_key_pair(id, Utc::now());
                self.key_pairs.insert(id, key_pair.clone());
                slot.insert(id);
                Ok(key_pair)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<KeyPair>> {
        Ok(self.key_pairs.get(&id).map(|k| k.clone()))
    }

    async fn find_by_public_key(&self, public_key: &str) -> AppResult<Option<KeyPair>> {
        let id = self.by_public_key.get(public_key).map(|id| *id);
        Ok(id.and_then(|id| self.key_pairs.get(&id).map(|k| k.clone())))
    }

    async fn find_by_project(&self, project_id: Uuid) -> AppResult<Vec<KeyPair>> {
        let mut key_pairs: Vec<KeyPair> = self
            .key_pairs
            .iter()
            .filter(|k| k.project_id == project_id)
            .map(|k| k.clone())
            .collect();
        key_pairs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(key_pairs)
    }

    async fn update(&self, id: Uuid, changes: &KeyPairChanges) -> AppResult<KeyPair> {
        let mut key_pair = self.key_pairs.get_mut(&id).ok_or_else(|| not_found(id))?;
        changes.apply_to(&mut key_pair, Utc::now());
        Ok(key_pair.clone())
    }

    async fn deactivate(&self, id: Uuid) -> AppResult<bool> {
        let mut key_pair = self.key_pairs.get_mut(&id).ok_or_else(|| not_found(id))?;
        let was_active = key_pair.is_active;
        key_pair.is_active = false;
        key_pair.updated_at = Utc::now();
        Ok(was_active)
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(mut key_pair) = self.key_pairs.get_mut(&id) {
            key_pair.last_used_at = Some(at);
        }
        Ok(())
    }
}
