#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::empty_loop)]
#![deny(clippy::indexing_slicing)]
//! # r-session
//!
//! Session tokens and defect status normalization for a rental-property backend.
//!
//! The library exposes these building blocks:
//! - [`SessionTokenManager`]: issues and verifies JWT access/refresh tokens and keeps
//!   refresh tokens revocable through a [`RefreshRegistry`].
//! - [`MemoryRefreshRegistry`] (and `RedisRefreshRegistry` with the `redis` feature):
//!   where refresh-token ids live until revoked.
//! - [`AuthUser`]: an actix-web / axum extractor that verifies the access token.
//! - [`StatusNormalizer`]: folds free-form defect statuses onto [`CanonicalStatus`].
//!
//! ## How authentication works
//!
//! 1. Your login handler checks credentials and calls
//!    [`SessionTokenManager::issue_token_pair`].
//! 2. The client sends the access token back via `Authorization` header or cookie:
//!    - `Authorization: Bearer <token>`
//!    - `Authorization: <token>`
//!    - `Cookie: access_token=<token>`
//! 3. Any handler that declares an [`AuthUser`] parameter becomes a protected endpoint.
//! 4. When the access token expires, the client trades its refresh token via
//!    [`SessionTokenManager::rotate_refresh_token`]. Logging out calls
//!    [`SessionTokenManager::revoke_refresh_token`].
//!
//! ## 日本語
//!
//! 賃貸物件管理バックエンド向けのセッション token と不具合ステータス正規化のライブラリです。
//!
//! - [`SessionTokenManager`]: JWT の access / refresh token を発行・検証し、refresh token は
//!   [`RefreshRegistry`] によって失効可能にします。
//! - [`AuthUser`]: access token を検証する actix-web / axum の extractor。
//! - [`StatusNormalizer`]: 自由入力のステータスを [`CanonicalStatus`] に正規化します。

#[cfg(feature = "axum")]
mod axum_support;
pub mod config;
pub mod defect;
mod memory;
mod models;
#[cfg(feature = "redis")]
pub mod redis;
mod registry;
mod session;
pub mod status;

pub use crate::config::TokenConfig;
pub use crate::defect::{Defect, DefectComment, NewDefect};
pub use crate::memory::MemoryRefreshRegistry;
pub use crate::models::{
    AccessTokenClaims, RSessionError, RefreshRegistryEntry, RefreshTokenClaims, SessionUser,
    TokenPair,
};
#[cfg(feature = "redis")]
pub use crate::redis::RedisRefreshRegistry;
pub use crate::registry::RefreshRegistry;
pub use crate::session::{AuthUser, SessionTokenManager};
pub use crate::status::{CanonicalStatus, StatusNormalizer};

/// Default cookie name for the access token.
///
/// ## 日本語
///
/// access token を入れる cookie の既定名。
pub const ACCESS_TOKEN_COOKIE_NAME: &str = "access_token";

/// Which source wins when both a header and a cookie carry a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenSourcePriority {
    #[default]
    HeaderFirst,
    CookieFirst,
}

/// Where extractors look for the access token.
///
/// Install it next to the manager (`app_data` / `Extension`) to override the
/// defaults; without it, `Authorization` and the `access_token` cookie are used.
///
/// ## 日本語
///
/// extractor が token を探す場所の設定。指定しない場合は `Authorization` header と
/// `access_token` cookie を使います。
#[derive(Clone, Debug)]
pub struct TokenSourceConfig {
    pub priority: TokenSourcePriority,
    pub header_names: Vec<String>,
    pub cookie_names: Vec<String>,
}

impl Default for TokenSourceConfig {
    fn default() -> Self {
        Self {
            priority: TokenSourcePriority::HeaderFirst,
            header_names: vec!["Authorization".to_string()],
            cookie_names: vec![ACCESS_TOKEN_COOKIE_NAME.to_string()],
        }
    }
}

/// Strips an optional `Bearer ` prefix and surrounding whitespace.
fn normalize_token(raw: &str) -> Option<String> {
    let raw = raw.trim_start();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolves a token using `cfg`, given lookups for header and cookie values.
///
/// Framework adapters supply the two closures; the lookup order is the same for all
/// of them.
pub fn extract_token_with_config<H, C>(
    cfg: &TokenSourceConfig,
    header: H,
    cookie: C,
) -> Option<String>
where
    H: Fn(&str) -> Option<String>,
    C: Fn(&str) -> Option<String>,
{
    let from_headers = || {
        cfg.header_names
            .iter()
            .find_map(|name| header(name).as_deref().and_then(normalize_token))
    };
    let from_cookies = || {
        cfg.cookie_names
            .iter()
            .find_map(|name| cookie(name).as_deref().and_then(normalize_token))
    };

    match cfg.priority {
        TokenSourcePriority::HeaderFirst => from_headers().or_else(from_cookies),
        TokenSourcePriority::CookieFirst => from_cookies().or_else(from_headers),
    }
}

/// Extracts the access token from an actix-web request.
///
/// Uses the [`TokenSourceConfig`] in `app_data` if present.
#[cfg(feature = "actix")]
pub fn extract_token_from_request(req: &actix_web::HttpRequest) -> Option<String> {
    let default_cfg = TokenSourceConfig::default();
    let cfg = req
        .app_data::<actix_web::web::Data<TokenSourceConfig>>()
        .map(|cfg| cfg.get_ref())
        .unwrap_or(&default_cfg);

    extract_token_with_config(
        cfg,
        |name| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        },
        |name| req.cookie(name).map(|c| c.value().to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_optional() {
        let cfg = TokenSourceConfig::default();
        let with_prefix = extract_token_with_config(
            &cfg,
            |_| Some("Bearer abc".to_string()),
            |_| None,
        );
        let bare = extract_token_with_config(&cfg, |_| Some("abc".to_string()), |_| None);

        assert_eq!(with_prefix.as_deref(), Some("abc"));
        assert_eq!(bare.as_deref(), Some("abc"));
    }

    #[test]
    fn priority_decides_between_header_and_cookie() {
        let header = |_: &str| Some("from-header".to_string());
        let cookie = |_: &str| Some("from-cookie".to_string());

        let header_first = TokenSourceConfig::default();
        let cookie_first = TokenSourceConfig {
            priority: TokenSourcePriority::CookieFirst,
            ..TokenSourceConfig::default()
        };

        assert_eq!(
            extract_token_with_config(&header_first, header, cookie).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            extract_token_with_config(&cookie_first, header, cookie).as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn empty_values_fall_through() {
        let cfg = TokenSourceConfig::default();
        let token = extract_token_with_config(
            &cfg,
            |_| Some("Bearer   ".to_string()),
            |name| (name == ACCESS_TOKEN_COOKIE_NAME).then(|| "xyz".to_string()),
        );
        assert_eq!(token.as_deref(), Some("xyz"));

        assert!(extract_token_with_config(&cfg, |_| None, |_| None).is_none());
    }
}
