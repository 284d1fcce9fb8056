/// ## 日本語
///
/// refresh token レジストリに保存されるレコードです。
///
/// key は token の `jti`。レコードが存在することが「まだ使える」の唯一の根拠です。
///
/// ## English
///
/// Record kept in the refresh-token registry, keyed by the token's `jti`.
///
/// Presence of the record is the only thing that makes a refresh token usable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RefreshRegistryEntry {
    /// ## 日本語
    ///
    /// token を発行したユーザー ID。
    ///
    /// ## English
    ///
    /// User the token was issued to.
    pub user_id: String,
    /// ## 日本語
    ///
    /// 有効期限（Unix epoch 秒）。
    ///
    /// ## English
    ///
    /// Expiration timestamp in Unix epoch seconds.
    pub expires_at: i64,
}

impl RefreshRegistryEntry {
    pub fn is_expired_at(&self, now_seconds: i64) -> bool {
        self.expires_at < now_seconds
    }
}
