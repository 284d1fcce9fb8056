use crate::config::TokenConfig;
use crate::memory::MemoryRefreshRegistry;
use crate::models::{
    AccessTokenClaims, RSessionError, RefreshRegistryEntry, RefreshTokenClaims, SessionUser,
    TokenPair,
};
use crate::registry::RefreshRegistry;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// Signing material for one token kind.
struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenKeys {
    fn new(secret: &str, ttl: std::time::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

struct Keys {
    access: TokenKeys,
    refresh: TokenKeys,
    validation: Validation,
}

/// ## 日本語
///
/// access / refresh token（JWT, HS256）を発行・検証し、refresh token の失効を管理します。
///
/// access token はステートレスで、プロフィール情報を含みます。refresh token は
/// ID と `jti` だけを含み、レジストリにレコードがある間だけ有効です。そのため
/// 暗号学的な有効期限より前にサーバ側で失効させられます。
///
/// アプリケーション state（`web::Data` / `Extension`）に保持する想定で、`Clone` は
/// 同じ鍵とレジストリへのハンドルを増やすだけです。
///
/// ## English
///
/// Issues and verifies access/refresh tokens (JWT, HS256) and tracks refresh-token
/// revocation.
///
/// Access tokens are stateless and carry profile claims. Refresh tokens carry only
/// the subject and a `jti`, and are usable only while the registry holds an entry
/// for that `jti`, which allows server-side revocation before cryptographic expiry.
///
/// Meant to live in application state (`web::Data` / `Extension`); `Clone` creates
/// another handle to the same keys and registry.
#[derive(Clone)]
pub struct SessionTokenManager {
    keys: Arc<Keys>,
    registry: Arc<dyn RefreshRegistry>,
}

impl SessionTokenManager {
    /// ## 日本語
    ///
    /// プロセス内レジストリを使うマネージャを作成します。
    ///
    /// ## English
    ///
    /// Creates a manager backed by a fresh in-process registry.
    pub fn new(config: &TokenConfig) -> Result<Self, RSessionError> {
        Self::with_registry(config, MemoryRefreshRegistry::new())
    }

    /// ## 日本語
    ///
    /// 任意の [`RefreshRegistry`] 実装を使うマネージャを作成します。
    ///
    /// 設定が不正（空の secret、同じ secret、TTL が 0）の場合は [`RSessionError::Config`] を返します。
    ///
    /// ## English
    ///
    /// Creates a manager on top of any [`RefreshRegistry`].
    ///
    /// Returns [`RSessionError::Config`] for empty or identical secrets and zero TTLs.
    pub fn with_registry(
        config: &TokenConfig,
        registry: impl RefreshRegistry + 'static,
    ) -> Result<Self, RSessionError> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            keys: Arc::new(Keys {
                access: TokenKeys::new(&config.access_secret, config.access_ttl),
                refresh: TokenKeys::new(&config.refresh_secret, config.refresh_ttl),
                validation,
            }),
            registry: Arc::new(registry),
        })
    }

    /// ## 日本語
    ///
    /// access token を発行します。レジストリは変更しません。
    ///
    /// ## English
    ///
    /// Signs an access token for `user`. Does not touch the registry.
    pub fn issue_access_token(&self, user: &SessionUser) -> Result<String, RSessionError> {
        let issued_at = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            subject_id: user.id.clone(),
            token_id: uuid::Uuid::new_v4().to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            issued_at,
            expires_at: issued_at.saturating_add(self.keys.access.ttl_seconds),
        };
        sign(&claims, &self.keys.access)
    }

    /// ## 日本語
    ///
    /// refresh token を発行し、`jti` をキーにレジストリへ登録します。
    ///
    /// ## English
    ///
    /// Signs a refresh token for `user` and registers its `jti`.
    pub async fn issue_refresh_token(&self, user: &SessionUser) -> Result<String, RSessionError> {
        let issued_at = Utc::now().timestamp();
        let claims = RefreshTokenClaims {
            subject_id: user.id.clone(),
            token_id: uuid::Uuid::new_v4().to_string(),
            issued_at,
            expires_at: issued_at.saturating_add(self.keys.refresh.ttl_seconds),
        };
        let token = sign(&claims, &self.keys.refresh)?;

        let entry = RefreshRegistryEntry {
            user_id: claims.subject_id,
            expires_at: claims.expires_at,
        };
        self.registry.insert(&claims.token_id, entry).await?;

        tracing::debug!(user_id = %user.id, token_id = %claims.token_id, "issued refresh token");
        Ok(token)
    }

    /// Issues the access/refresh pair a login handler returns.
    pub async fn issue_token_pair(&self, user: &SessionUser) -> Result<TokenPair, RSessionError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user).await?,
        })
    }

    /// ## 日本語
    ///
    /// access token の署名と有効期限を検証し、claims を返します。
    ///
    /// ## English
    ///
    /// Checks signature and expiry against the access secret.
    ///
    /// Fails with [`RSessionError::ExpiredToken`] past `exp` and
    /// [`RSessionError::InvalidToken`] for anything else.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, RSessionError> {
        verify(token, &self.keys.access, &self.keys.validation).inspect_err(|e| {
            tracing::debug!(error = %e, "access token rejected");
        })
    }

    /// Checks signature and expiry against the refresh secret.
    ///
    /// This is the cryptographic check only; see [`Self::is_refresh_valid`].
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, RSessionError> {
        verify(token, &self.keys.refresh, &self.keys.validation).inspect_err(|e| {
            tracing::debug!(error = %e, "refresh token rejected");
        })
    }

    /// ## 日本語
    ///
    /// `jti` のレコードが存在し、そのユーザー ID が `sub` と一致する場合のみ `true` を返します。
    /// 有効期限はここでは確認しません（検証時に確認済み）。
    ///
    /// ## English
    ///
    /// `true` iff the registry holds an entry for the `jti` whose user matches `sub`.
    /// Expiry is not rechecked here; it is enforced at verify time.
    pub async fn is_refresh_valid(&self, claims: &RefreshTokenClaims) -> Result<bool, RSessionError> {
        let entry = self.registry.lookup(&claims.token_id).await?;
        Ok(entry.is_some_and(|entry| entry.user_id == claims.subject_id))
    }

    /// ## 日本語
    ///
    /// refresh token をレジストリから削除して失効させます。
    ///
    /// この操作は冪等です。存在しない `jti` を削除しても成功として扱います。
    ///
    /// ## English
    ///
    /// Revokes a refresh token by removing its registry entry.
    ///
    /// This operation is idempotent: removing an unknown `jti` is treated as success.
    pub async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), RSessionError> {
        self.registry.remove(token_id).await?;
        tracing::debug!(token_id = %token_id, "revoked refresh token");
        Ok(())
    }

    /// Verifies a refresh token and requires it to still be registered.
    ///
    /// A registry miss is reported as [`RSessionError::RevokedToken`].
    pub async fn authenticate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenClaims, RSessionError> {
        let claims = self.verify_refresh_token(token)?;
        if !self.is_refresh_valid(&claims).await? {
            tracing::warn!(
                user_id = %claims.subject_id,
                token_id = %claims.token_id,
                "refresh token not registered"
            );
            return Err(RSessionError::RevokedToken);
        }
        Ok(claims)
    }

    /// ## 日本語
    ///
    /// refresh token を検証して失効させ、新しい token ペアを発行します。
    ///
    /// `user` は token の `sub` と一致する必要があります（通常は `sub` で読み込んだユーザー）。
    /// 一致しない場合は [`RSessionError::InvalidToken`] を返します。
    ///
    /// 同じ token で同時に呼ばれても、レジストリから実際に削除できた 1 つだけが成功します。
    ///
    /// ## English
    ///
    /// Authenticates the refresh token, revokes it, and issues a new pair.
    ///
    /// `user` must be the account named by the token's `sub` (typically loaded from it);
    /// a mismatch yields [`RSessionError::InvalidToken`].
    ///
    /// A refresh token rotates at most once: when concurrent calls present the same
    /// token, only the one whose removal takes the registry entry gets a new pair and
    /// the others fail with [`RSessionError::RevokedToken`].
    pub async fn rotate_refresh_token(
        &self,
        token: &str,
        user: &SessionUser,
    ) -> Result<TokenPair, RSessionError> {
        let claims = self.authenticate_refresh_token(token).await?;
        if claims.subject_id != user.id {
            tracing::warn!(
                token_user = %claims.subject_id,
                user_id = %user.id,
                "refresh token presented for another user"
            );
            return Err(RSessionError::InvalidToken);
        }

        if !self.registry.remove(&claims.token_id).await? {
            tracing::warn!(
                user_id = %claims.subject_id,
                token_id = %claims.token_id,
                "refresh token already rotated"
            );
            return Err(RSessionError::RevokedToken);
        }
        tracing::debug!(token_id = %claims.token_id, "revoked refresh token");
        self.issue_token_pair(user).await
    }
}

fn sign<T: Serialize>(claims: &T, keys: &TokenKeys) -> Result<String, RSessionError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
        .map_err(RSessionError::Signing)
}

fn verify<T: DeserializeOwned>(
    token: &str,
    keys: &TokenKeys,
    validation: &Validation,
) -> Result<T, RSessionError> {
    jsonwebtoken::decode::<T>(token.trim(), &keys.decoding, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => RSessionError::ExpiredToken,
            _ => RSessionError::InvalidToken,
        })
}

/// ## 日本語
///
/// actix-web / axum から抽出される認証済みユーザーコンテキストです。
///
/// 抽出が成功した場合、各フィールドは検証済みの access token の claims から取られます。
///
/// ## English
///
/// An authenticated request context extracted from actix-web or axum.
///
/// On success every field comes from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The `sub` claim.
    pub id: String,
    pub email: String,
    pub username: String,
    /// The raw access token from the request.
    pub token: String,
}

impl AuthUser {
    pub(crate) fn from_claims(claims: AccessTokenClaims, token: String) -> Self {
        Self {
            id: claims.subject_id,
            email: claims.email,
            username: claims.username,
            token,
        }
    }
}

/// ## 日本語
///
/// actix-web のリクエストから [`AuthUser`] を抽出します。
///
/// 失敗時：
/// - 500：`app_data` にマネージャが無い
/// - 401：token が無い／無効／期限切れ（どれも同じメッセージ）
///
/// ## English
///
/// Extracts [`AuthUser`] from an actix-web request.
///
/// Failure modes:
/// - 500: manager is missing from `app_data`
/// - 401: token is missing, invalid, or expired (all with the same message)
#[cfg(feature = "actix")]
impl actix_web::FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        use actix_web::web;

        let manager = match req.app_data::<web::Data<SessionTokenManager>>() {
            Some(m) => m,
            None => {
                return std::future::ready(Err(actix_web::error::ErrorInternalServerError(
                    "Session manager not found",
                )));
            }
        };
        let Some(token) = crate::extract_token_from_request(req) else {
            return std::future::ready(Err(RSessionError::InvalidToken.into()));
        };

        std::future::ready(
            manager
                .verify_access_token(&token)
                .map(|claims| AuthUser::from_claims(claims, token))
                .map_err(actix_web::Error::from),
        )
    }
}
