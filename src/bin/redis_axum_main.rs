//! ## 日本語
//!
//! refresh token レジストリを Redis/Valkey に置いて axum で使うサンプルです。
//! 複数インスタンスでログアウト状態を共有できます。
//!
//! 環境変数：
//! - `REDIS_URL`（デフォルト：`redis://127.0.0.1/`）
//! - `R_SESSION_PREFIX`（デフォルト：`r_session:refresh:`）
//! - `JWT_ACCESS_SECRET` / `JWT_REFRESH_SECRET` など（[`TokenConfig::from_env`] を参照）
//!
//! ## English
//!
//! axum example with the refresh registry kept in Redis/Valkey, so several
//! instances agree on which refresh tokens are revoked.
//!
//! Environment variables:
//! - `REDIS_URL` (default: `redis://127.0.0.1/`)
//! - `R_SESSION_PREFIX` (default: `r_session:refresh:`)
//! - `JWT_ACCESS_SECRET` / `JWT_REFRESH_SECRET` and friends (see [`TokenConfig::from_env`])

use axum::{
    Json, Router,
    extract::Extension,
    response::IntoResponse,
    routing::{get, post},
};
use r_session::{
    AuthUser, RSessionError, RedisRefreshRegistry, SessionTokenManager, SessionUser, TokenConfig,
    TokenPair,
};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

async fn login(
    Extension(manager): Extension<SessionTokenManager>,
    Json(user): Json<SessionUser>,
) -> Result<Json<TokenPair>, RSessionError> {
    Ok(Json(manager.issue_token_pair(&user).await?))
}

async fn info(user: AuthUser) -> impl IntoResponse {
    format!("info: {}", user.id)
}

async fn logout(
    Extension(manager): Extension<SessionTokenManager>,
    Json(body): Json<RefreshRequest>,
) -> Result<&'static str, RSessionError> {
    let claims = manager.verify_refresh_token(&body.refresh_token)?;
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

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let prefix =
        std::env::var("R_SESSION_PREFIX").unwrap_or_else(|_| "r_session:refresh:".to_string());

    let registry = RedisRefreshRegistry::connect(&redis_url, prefix).await?;
    let manager = SessionTokenManager::with_registry(&TokenConfig::from_env()?, registry)?;

    let app = Router::new()
        .route("/login", post(login))
        .route("/info", get(info))
        .route("/logout", post(logout))
        .layer(Extension(manager));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8083").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
