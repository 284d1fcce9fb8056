//! ## 日本語
//!
//! refresh token レジストリの抽象です。
//!
//! マネージャはこの trait だけに依存するため、プロセス内の [`crate::MemoryRefreshRegistry`] と
//! 複数インスタンス向けの Redis 実装を呼び出し側を変えずに差し替えられます。
//!
//! ## English
//!
//! Refresh-token registry capability.
//!
//! The session manager only depends on this trait, so the in-process
//! [`crate::MemoryRefreshRegistry`] and the Redis-backed store used by
//! multi-instance deployments are interchangeable.

use crate::models::{RSessionError, RefreshRegistryEntry};

#[async_trait::async_trait]
pub trait RefreshRegistry: Send + Sync {
    /// Stores `entry` under `token_id`, replacing any previous entry.
    async fn insert(&self, token_id: &str, entry: RefreshRegistryEntry)
    -> Result<(), RSessionError>;

    /// Returns the entry for `token_id`, if any.
    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshRegistryEntry>, RSessionError>;

    /// Removes the entry for `token_id`.
    ///
    /// Returns `true` only for the call that actually removed it. Removing a
    /// missing id is not an error and returns `false`.
    async fn remove(&self, token_id: &str) -> Result<bool, RSessionError>;
}
