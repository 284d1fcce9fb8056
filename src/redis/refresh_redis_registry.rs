//! ## 日本語
//!
//! Redis/Valkey をバックエンドにした refresh token レジストリです。
//!
//! レコードは `prefix + jti` を key、JSON エンコードされた [`RefreshRegistryEntry`] を
//! value として保存します。TTL は token の残り寿命に合わせるため、期限切れのレコードは
//! Redis が自動的に削除します（スイープ不要）。
//!
//! ## English
//!
//! Redis/Valkey-backed refresh-token registry.
//!
//! Entries are stored as `prefix + jti` keys with a JSON-encoded
//! [`RefreshRegistryEntry`] value. The key TTL matches the token's remaining lifetime,
//! so Redis drops expired entries on its own and no sweep is needed.

use crate::models::{RSessionError, RefreshRegistryEntry};
use crate::registry::RefreshRegistry;
use redis::AsyncCommands;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Mutex;

const POOL_SIZE: usize = 4;

fn registry_error(e: impl std::fmt::Display) -> RSessionError {
    RSessionError::Registry {
        message: e.to_string(),
    }
}

fn normalize_prefix(prefix: impl Into<String>) -> String {
    // 日本語: prefix は常に ':' で終わるように正規化する（key を単純連結できるようにする）
    // English: Normalize prefix to always end with ':' (so key concatenation is trivial)
    let mut prefix = prefix.into();
    if !prefix.ends_with(':') {
        prefix.push(':');
    }
    prefix
}

/// ## 日本語
///
/// Redis/Valkey をバックエンドにした [`RefreshRegistry`] 実装です。
///
/// ## English
///
/// A [`RefreshRegistry`] backed by Redis/Valkey.
#[derive(Clone)]
pub struct RedisRefreshRegistry {
    // 日本語: Redis の key に付ける prefix。例: "r_session:refresh:" + jti
    // English: Prefix for keys in Redis, e.g. "r_session:refresh:" + jti.
    prefix: String,

    // 日本語: 共有の非同期 ConnectionManager。tokio::Mutex で 1 接続 1 タスクに直列化する。
    // English: Shared async ConnectionManagers; tokio::Mutex serializes access per connection.
    connections: Arc<Vec<Mutex<redis::aio::ConnectionManager>>>,
    next_index: Arc<AtomicUsize>,
}

impl RedisRefreshRegistry {
    /// ## 日本語
    ///
    /// 既存の接続マネージャからレジストリを作成します。
    ///
    /// ## English
    ///
    /// Creates a registry from an existing async connection manager.
    ///
    /// The `prefix` is normalized to always end with `:`.
    pub fn new(prefix: impl Into<String>, connection: redis::aio::ConnectionManager) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            connections: Arc::new(vec![Mutex::new(connection)]),
            next_index: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// ## 日本語
    ///
    /// Redis/Valkey に接続してレジストリを作成します。
    ///
    /// 内部で複数の接続を確保し、簡易的なラウンドロビンで利用します。
    ///
    /// ## English
    ///
    /// Connects to Redis/Valkey and creates a registry.
    ///
    /// A small connection pool is opened and used round-robin.
    pub async fn connect(
        redis_url: &str,
        prefix: impl Into<String>,
    ) -> Result<Self, RSessionError> {
        let client = redis::Client::open(redis_url).map_err(registry_error)?;

        let mut connections = Vec::with_capacity(POOL_SIZE);
        for _ in 0..POOL_SIZE {
            let connection = client
                .get_connection_manager()
                .await
                .map_err(registry_error)?;
            connections.push(Mutex::new(connection));
        }
        tracing::info!(pool_size = POOL_SIZE, "connected refresh registry to redis");

        Ok(Self {
            prefix: normalize_prefix(prefix),
            connections: Arc::new(connections),
            next_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Locks and returns the next connection from the pool.
    async fn lock_connection(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, redis::aio::ConnectionManager>, RSessionError> {
        let len = self.connections.len();
        if len == 0 {
            return Err(registry_error("no redis connections"));
        }
        let index = self.next_index.fetch_add(1, Ordering::Relaxed) % len;
        match self.connections.get(index) {
            Some(conn) => Ok(conn.lock().await),
            None => Err(registry_error("no redis connections")),
        }
    }

    fn key(&self, token_id: &str) -> String {
        format!("{}{}", self.prefix, token_id)
    }

    /// ## 日本語
    ///
    /// レコードの残り TTL（秒）を返します。key が存在しない場合は `Ok(None)`。
    ///
    /// ## English
    ///
    /// Remaining TTL of an entry in seconds, or `Ok(None)` when the key is missing.
    pub async fn ttl_seconds(&self, token_id: &str) -> Result<Option<i64>, RSessionError> {
        let key = self.key(token_id);
        let mut connection = self.lock_connection().await?;
        let ttl: i64 = connection.ttl(key).await.map_err(registry_error)?;
        if ttl == -2 {
            return Ok(None);
        }
        Ok(Some(ttl))
    }
}

#[async_trait::async_trait]
impl RefreshRegistry for RedisRefreshRegistry {
    async fn insert(
        &self,
        token_id: &str,
        entry: RefreshRegistryEntry,
    ) -> Result<(), RSessionError> {
        let key = self.key(token_id);
        let remaining = entry
            .expires_at
            .saturating_sub(chrono::Utc::now().timestamp());
        // 日本語: すでに期限切れなら保存しない（検証時に失敗するため）。
        // English: Nothing to store for an already expired token; verification rejects it anyway.
        let Ok(ttl_seconds) = u64::try_from(remaining) else {
            return Ok(());
        };
        let ttl_seconds = ttl_seconds.max(1);

        let value = serde_json::to_string(&entry).map_err(registry_error)?;
        let mut connection = self.lock_connection().await?;
        let _: () = connection
            .set_ex(key, value, ttl_seconds)
            .await
            .map_err(registry_error)?;
        Ok(())
    }

    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshRegistryEntry>, RSessionError> {
        let key = self.key(token_id);
        let mut connection = self.lock_connection().await?;

        // 日本語: key が無い（失効済み・期限切れ）場合は None
        // English: None when the key is missing (revoked or expired)
        let value: Option<String> = connection.get(key).await.map_err(registry_error)?;
        let Some(value) = value else {
            return Ok(None);
        };

        // 日本語: 壊れた value は「存在しない」として扱い、token を通さない。
        // English: A value that fails to parse is treated as missing so the token is refused.
        match serde_json::from_str::<RefreshRegistryEntry>(&value) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(token_id = %token_id, error = %e, "unreadable refresh registry entry");
                Ok(None)
            }
        }
    }

    async fn remove(&self, token_id: &str) -> Result<bool, RSessionError> {
        let key = self.key(token_id);
        let mut connection = self.lock_connection().await?;

        // 日本語: DEL は原子的なので、件数が 1 になるのは 1 つの呼び出しだけ。
        // English: DEL is atomic, so only one caller sees a count of 1.
        let removed: i64 = connection.del(key).await.map_err(registry_error)?;
        Ok(removed > 0)
    }
}
