//! ## 日本語
//!
//! axum 向けの extractor 実装です。
//!
//! - `Extension<SessionTokenManager>` を state から取得し
//! - Header/Cookie から access token を抽出して検証し
//! - `AuthUser` を handler 引数として利用できるようにします
//!
//! ## English
//!
//! Axum extractor implementation.
//!
//! - Fetches `Extension<SessionTokenManager>` from request state
//! - Extracts the access token from headers/cookies and verifies it
//! - Enables `AuthUser` as a handler parameter

use crate::{AuthUser, RSessionError, SessionTokenManager, TokenSourceConfig, extract_token_with_config};
use axum::{
    extract::{Extension, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

fn cookie_header_string(parts: &Parts) -> Option<String> {
    // 日本語: Cookie header は複数来る可能性があるため結合して扱う。
    // English: Cookie headers may appear multiple times; concatenate them.
    let joined = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    if joined.is_empty() { None } else { Some(joined) }
}

fn find_cookie_value(cookie_header: &str, target_name: &str) -> Option<String> {
    // 日本語: "name=value; name2=value2" 形式の cookie を cookie crate でパースする。
    // English: Parse "name=value; name2=value2" with the cookie crate.
    cookie::Cookie::split_parse(cookie_header)
        .filter_map(Result::ok)
        .find(|c| c.name() == target_name)
        .map(|c| c.value().to_string())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 日本語: 1) アプリ state から SessionTokenManager を取り出す。
        //        ルータに `.layer(Extension(manager))` が必要。
        // English: 1) Fetch SessionTokenManager from request state.
        //          The router must install `.layer(Extension(manager))`.
        let Extension(manager) =
            Extension::<SessionTokenManager>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Session manager not found").into_response()
                })?;

        // 日本語: 2) TokenSourceConfig を任意で読む（無ければデフォルト）。
        // English: 2) Read TokenSourceConfig if provided; otherwise use defaults.
        let cfg = match Extension::<TokenSourceConfig>::from_request_parts(parts, state).await {
            Ok(Extension(cfg)) => cfg,
            Err(_) => TokenSourceConfig::default(),
        };

        let cookie_header = cookie_header_string(parts);

        // 日本語: 3) header/cookie から token を抽出する（優先順位は cfg に従う）。
        // English: 3) Extract token from header/cookie (priority controlled by cfg).
        let token = extract_token_with_config(
            &cfg,
            |name| {
                parts
                    .headers
                    .get(name)
                    .and_then(|h| h.to_str().ok())
                    .map(|s| s.to_string())
            },
            |name| {
                cookie_header
                    .as_deref()
                    .and_then(|h| find_cookie_value(h, name))
            },
        )
        .ok_or_else(|| RSessionError::InvalidToken.into_response())?;

        // 日本語: 4) 署名と有効期限を検証する。失敗はすべて 401（同じメッセージ）。
        // English: 4) Verify signature and expiry. Every failure is a 401 with the same body.
        let claims = manager
            .verify_access_token(&token)
            .map_err(IntoResponse::into_response)?;
        Ok(AuthUser::from_claims(claims, token))
    }
}
