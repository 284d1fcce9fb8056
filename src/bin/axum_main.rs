//! ## 日本語
//!
//! r-session をインメモリレジストリで axum から使う最小サンプルです。
//!
//! - `/login`: token ペア発行（access token を Cookie にもセット）
//! - `/profile`: `AuthUser` extractor による保護
//! - `/logout`: refresh token 失効
//!
//! ## English
//!
//! Minimal axum example using the in-memory refresh registry.
//!
//! - `/login`: issues a token pair (also sets the access token cookie)
//! - `/profile`: protected via the `AuthUser` extractor
//! - `/logout`: revokes the refresh token

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cookie::{Cookie, SameSite};
use r_session::{
    ACCESS_TOKEN_COOKIE_NAME, AuthUser, RSessionError, SessionTokenManager, SessionUser,
    TokenConfig, TokenPair,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn login(
    Extension(manager): Extension<SessionTokenManager>,
    Json(user): Json<SessionUser>,
) -> Result<Response, RSessionError> {
    let tokens = manager.issue_token_pair(&user).await?;

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE_NAME, tokens.access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    let mut resp = Json(tokens).into_response();
    if let Ok(value) = HeaderValue::from_str(cookie.to_string().as_str()) {
        resp.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(resp)
}

async fn profile(user: AuthUser) -> impl IntoResponse {
    format!("Profile: {} <{}>", user.username, user.email)
}

async fn logout(
    Extension(manager): Extension<SessionTokenManager>,
    _user: AuthUser,
    Json(tokens): Json<TokenPair>,
) -> Result<&'static str, RSessionError> {
    let claims = manager.verify_refresh_token(&tokens.refresh_token)?;
    manager.revoke_refresh_token(&claims.token_id).await?;
    Ok("Logged out")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "r_session=debug,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let manager = SessionTokenManager::new(&TokenConfig::from_env()?)?;
    let app = Router::new()
        .route("/login", post(login))
        .route("/profile", get(profile))
        .route("/logout", post(logout))
        .layer(Extension(manager));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8082").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
