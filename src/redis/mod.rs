//! ## 日本語
//!
//! Redis/Valkey バックエンドの refresh token レジストリです。
//!
//! `redis` feature により [`RedisRefreshRegistry`] が利用可能になります。複数インスタンスで
//! 同じレジストリを共有する場合に使います。
//!
//! ## English
//!
//! Redis/Valkey-backed refresh-token registry.
//!
//! Enabling the `redis` feature makes [`RedisRefreshRegistry`] available. Use it when
//! several instances must share one registry.

mod refresh_redis_registry;

pub use refresh_redis_registry::RedisRefreshRegistry;
