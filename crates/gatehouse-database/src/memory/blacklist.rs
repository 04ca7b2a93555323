//! In-memory blacklist repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::revocation::{BlacklistEntry, UserRevocation};

use crate::repository::BlacklistRepository;

/// `DashMap`-backed [`BlacklistRepository`].
#[derive(Debug, Default)]
pub struct MemoryBlacklistRepository {
    entries: DashMap<Uuid, BlacklistEntry>,
    cutoffs: DashMap<Uuid, UserRevocation>,
}

#[async_trait]
impl BlacklistRepository for MemoryBlacklistRepository {
    async fn insert(&self, entry: BlacklistEntry) -> AppResult<()> {
        self.entries.entry(entry.jti).or_insert(entry);
        Ok(())
    }

    async fn find(&self, jti: Uuid) -> AppResult<Option<BlacklistEntry>> {
        Ok(self.entries.get(&jti).map(|e| e.clone()))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        Ok((before - self.entries.len()) as u64)
    }

    async fn upsert_user_revocation(
        &self,
        revocation: UserRevocation,
    ) -> AppResult<UserRevocation> {
        let stored = match self.cutoffs.entry(revocation.user_id) {
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                current.revoked_before = current.revoked_before.max(revocation.revoked_before);
                current.reason = revocation.reason;
                current.created_at = revocation.created_at;
                current.clone()
            }
            Entry::Vacant(slot) => slot.insert(revocation).clone(),
        };
        Ok(stored)
    }

    async fn find_user_revocation(&self, user_id: Uuid) -> AppResult<Option<UserRevocation>> {
        Ok(self.cutoffs.get(&user_id).map(|r| r.clone()))
    }

    async fn delete_user_revocations_before(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let count = self.cutoffs.len();
        self.cutoffs.retain(|_, r| r.revoked_before >= before);
        Ok((count - self.cutoffs.len()) as u64)
    }
}
