//! Session-scoped storage for pending admin confirmations.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::cache::Cache;
use crate::config::CACHE_PREFIX_CONFIRMATION;
use crate::domain::{PendingConfirmation, SessionKey};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// At most one pending confirmation per admin session.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ConfirmationStore: Send + Sync {
    /// Store `pending`, replacing whatever the session had.
    async fn save(&self, key: SessionKey, pending: PendingConfirmation) -> AppResult<()>;

    async fn load(&self, key: SessionKey) -> AppResult<Option<PendingConfirmation>>;

    /// Persist a bumped attempt counter without extending the lifetime.
    async fn record_failure(&self, key: SessionKey, pending: PendingConfirmation) -> AppResult<()>;

    /// Remove and return the pending confirmation in one step.
    ///
    /// Of two concurrent callers at most one receives `Some`.
    async fn take(&self, key: SessionKey) -> AppResult<Option<PendingConfirmation>>;

    async fn discard(&self, key: SessionKey) -> AppResult<()>;
}

fn cache_key(key: SessionKey) -> String {
    format!("{}{}", CACHE_PREFIX_CONFIRMATION, key)
}

#[async_trait]
impl ConfirmationStore for Cache {
    async fn save(&self, key: SessionKey, pending: PendingConfirmation) -> AppResult<()> {
        let ttl = pending.remaining_seconds();
        self.set_with_ttl(&cache_key(key), &pending, ttl).await
    }

    async fn load(&self, key: SessionKey) -> AppResult<Option<PendingConfirmation>> {
        self.get(&cache_key(key)).await
    }

    async fn record_failure(&self, key: SessionKey, pending: PendingConfirmation) -> AppResult<()> {
        // A key that expired meanwhile stays gone
        self.replace_keep_ttl(&cache_key(key), &pending).await?;
        Ok(())
    }

    async fn take(&self, key: SessionKey) -> AppResult<Option<PendingConfirmation>> {
        Cache::take(self, &cache_key(key)).await
    }

    async fn discard(&self, key: SessionKey) -> AppResult<()> {
        self.delete(&cache_key(key)).await
    }
}

/// Process-local confirmation store. Readers enforce expiry through
/// `PendingConfirmation::expires_at`; every save sweeps out expired entries.
#[derive(Default)]
pub struct MemoryConfirmationStore {
    entries: Mutex<HashMap<SessionKey, PendingConfirmation>>,
}

impl MemoryConfirmationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfirmationStore for MemoryConfirmationStore {
    async fn save(&self, key: SessionKey, pending: PendingConfirmation) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, existing| !existing.is_expired());
        entries.insert(key, pending);
        Ok(())
    }

    async fn load(&self, key: SessionKey) -> AppResult<Option<PendingConfirmation>> {
        let mut entries = self.entries.lock().await;
        if entries.get(&key).is_some_and(PendingConfirmation::is_expired) {
            entries.remove(&key);
        }
        Ok(entries.get(&key).cloned())
    }

    async fn record_failure(&self, key: SessionKey, pending: PendingConfirmation) -> AppResult<()> {
        if let Some(slot) = self.entries.lock().await.get_mut(&key) {
            *slot = pending;
        }
        Ok(())
    }

    async fn take(&self, key: SessionKey) -> AppResult<Option<PendingConfirmation>> {
        Ok(self.entries.lock().await.remove(&key))
    }

    async fn discard(&self, key: SessionKey) -> AppResult<()> {
        self.entries.lock().await.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdminAction;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn key() -> SessionKey {
        SessionKey::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_cache_key_layout() {
        let k = key();
        assert_eq!(
            cache_key(k),
            format!("confirm:{}:{}", k.admin_id, k.session_id)
        );
    }

    #[tokio::test]
    async fn test_take_is_single_shot() {
        let store = MemoryConfirmationStore::new();
        let k = key();
        let pending = PendingConfirmation::new(AdminAction::GrantAdmin, Uuid::new_v4(), 60);
        store.save(k, pending.clone()).await.unwrap();

        assert_eq!(store.take(k).await.unwrap(), Some(pending));
        assert_eq!(store.take(k).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemoryConfirmationStore::new();
        let admin = Uuid::new_v4();
        let mine = SessionKey::new(admin, Uuid::new_v4());
        let other = SessionKey::new(admin, Uuid::new_v4());

        let pending = PendingConfirmation::new(AdminAction::DeleteUser, Uuid::new_v4(), 60);
        store.save(mine, pending).await.unwrap();

        assert!(store.load(other).await.unwrap().is_none());
        assert!(store.load(mine).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped_on_load() {
        let store = MemoryConfirmationStore::new();
        let k = key();
        let mut pending = PendingConfirmation::new(AdminAction::RevokeAdmin, Uuid::new_v4(), 60);
        pending.expires_at = Utc::now() - Duration::seconds(5);
        store.save(k, pending).await.unwrap();

        assert!(store.load(k).await.unwrap().is_none());
        assert!(store.take(k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_sweeps_abandoned_sessions() {
        let store = MemoryConfirmationStore::new();
        let mut stale = PendingConfirmation::new(AdminAction::DeleteUser, Uuid::new_v4(), 60);
        stale.expires_at = Utc::now() - Duration::seconds(5);
        store.save(key(), stale).await.unwrap();
        store
            .save(key(), PendingConfirmation::new(AdminAction::GrantAdmin, Uuid::new_v4(), 60))
            .await
            .unwrap();

        assert_eq!(store.entries.lock().await.len(), 1);
    }
}
