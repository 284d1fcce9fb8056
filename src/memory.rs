use crate::models::{RSessionError, RefreshRegistryEntry};
use crate::registry::RefreshRegistry;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// ## 日本語
///
/// プロセス内で refresh token を管理するレジストリです。
///
/// 内部では `Arc<Mutex<...>>` を使って状態を共有します。そのため `Clone` は同じストアへの
/// ハンドルを増やすだけです。プロセスの再起動で内容は失われます。
///
/// 期限切れのレコードは自動では削除されません。必要なら [`MemoryRefreshRegistry::prune_expired`]
/// を呼び出してください。
///
/// ## English
///
/// In-process refresh-token registry.
///
/// Internally it uses an `Arc<Mutex<...>>`, so `Clone` creates another handle to the
/// same shared store. Contents are lost when the process exits.
///
/// Expired entries are never removed on their own; call
/// [`MemoryRefreshRegistry::prune_expired`] if you want a sweep.
#[derive(Clone, Default)]
pub struct MemoryRefreshRegistry {
    store: Arc<Mutex<HashMap<String, RefreshRegistryEntry>>>,
}

impl MemoryRefreshRegistry {
    /// ## 日本語
    ///
    /// 空のレジストリを作成します。
    ///
    /// ## English
    ///
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// ## 日本語
    ///
    /// 登録されているレコード数を返します（期限切れも含む）。
    ///
    /// ## English
    ///
    /// Returns how many entries are stored, expired ones included.
    pub fn len(&self) -> Result<usize, RSessionError> {
        let store = self.store.lock().map_err(|_| RSessionError::MutexPoisoned)?;
        Ok(store.len())
    }

    pub fn is_empty(&self) -> Result<bool, RSessionError> {
        Ok(self.len()? == 0)
    }

    /// ## 日本語
    ///
    /// 期限切れのレコードを削除し、削除した件数を返します。
    ///
    /// ## English
    ///
    /// Removes expired entries and returns how many were removed.
    pub fn prune_expired(&self) -> Result<usize, RSessionError> {
        let now = Utc::now().timestamp();
        let mut store = self.store.lock().map_err(|_| RSessionError::MutexPoisoned)?;

        let original_len = store.len();
        store.retain(|_token_id, entry| !entry.is_expired_at(now));
        let removed = original_len - store.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned expired refresh tokens");
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl RefreshRegistry for MemoryRefreshRegistry {
    async fn insert(
        &self,
        token_id: &str,
        entry: RefreshRegistryEntry,
    ) -> Result<(), RSessionError> {
        self.store
            .lock()
            .map_err(|_| RSessionError::MutexPoisoned)?
            .insert(token_id.to_string(), entry);
        Ok(())
    }

    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshRegistryEntry>, RSessionError> {
        let store = self.store.lock().map_err(|_| RSessionError::MutexPoisoned)?;
        Ok(store.get(token_id).cloned())
    }

    async fn remove(&self, token_id: &str) -> Result<bool, RSessionError> {
        let removed = self
            .store
            .lock()
            .map_err(|_| RSessionError::MutexPoisoned)?
            .remove(token_id)
            .is_some();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: &str, expires_at: i64) -> RefreshRegistryEntry {
        RefreshRegistryEntry {
            user_id: user_id.to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn insert_lookup_remove() -> Result<(), RSessionError> {
        let registry = MemoryRefreshRegistry::new();
        let exp = Utc::now().timestamp() + 60;

        registry.insert("jti-1", entry("u1", exp)).await?;
        assert_eq!(registry.lookup("jti-1").await?, Some(entry("u1", exp)));

        assert!(registry.remove("jti-1").await?);
        assert_eq!(registry.lookup("jti-1").await?, None);

        // idempotent, but only the first call removes
        assert!(!registry.remove("jti-1").await?);
        Ok(())
    }

    #[tokio::test]
    async fn clones_share_the_store() -> Result<(), RSessionError> {
        let registry = MemoryRefreshRegistry::new();
        let handle = registry.clone();

        handle.insert("jti-2", entry("u2", i64::MAX)).await?;
        assert!(registry.lookup("jti-2").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn entries_are_not_swept_without_prune() -> Result<(), RSessionError> {
        let registry = MemoryRefreshRegistry::new();
        let past = Utc::now().timestamp() - 10;

        registry.insert("stale", entry("u3", past)).await?;
        registry.insert("fresh", entry("u3", past + 3600)).await?;
        assert_eq!(registry.len()?, 2);
        assert!(registry.lookup("stale").await?.is_some());

        assert_eq!(registry.prune_expired()?, 1);
        assert!(registry.lookup("stale").await?.is_none());
        assert!(registry.lookup("fresh").await?.is_some());
        Ok(())
    }
}
