#![cfg(feature = "axum")]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use http_body_util::BodyExt;
use r_session::{
    ACCESS_TOKEN_COOKIE_NAME, AuthUser, SessionTokenManager, SessionUser, TokenConfig,
    TokenSourceConfig, TokenSourcePriority,
};
use tower::ServiceExt;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

async fn protected(user: AuthUser) -> impl IntoResponse {
    format!("User: {}", user.username)
}

fn manager() -> SessionTokenManager {
    SessionTokenManager::new(&TokenConfig::new("axum-access", "axum-refresh")).unwrap()
}

fn alice() -> SessionUser {
    SessionUser::new("u1", "a@b.com", "alice")
}

async fn body_text(resp: axum::response::Response) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?
        .to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn protected_route_without_token() -> TestResult {
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(manager()));

    let req = Request::builder().uri("/protected").body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_route_with_invalid_token() -> TestResult {
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(manager()));

    let req = Request::builder()
        .uri("/protected")
        .header("Authorization", "invalid-token-xyz")
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = serde_json::from_str(&body_text(resp).await?)?;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(
        body["error"]["message"],
        "Invalid or expired token, please sign in again"
    );
    Ok(())
}

#[tokio::test]
async fn protected_route_with_valid_token() -> TestResult {
    let manager = manager();
    let token = manager.issue_access_token(&alice())?;
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(manager));

    let req = Request::builder()
        .uri("/protected")
        .header("Authorization", token.as_str())
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await?, "User: alice");
    Ok(())
}

#[tokio::test]
async fn protected_route_with_bearer_token() -> TestResult {
    let manager = manager();
    let token = manager.issue_access_token(&alice())?;
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(manager));

    let req = Request::builder()
        .uri("/protected")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn refresh_token_is_refused() -> TestResult {
    let manager = manager();
    let pair = manager.issue_token_pair(&alice()).await?;
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(manager));

    let req = Request::builder()
        .uri("/protected")
        .header("Authorization", format!("Bearer {}", pair.refresh_token))
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_route_with_cookie_token() -> TestResult {
    let manager = manager();
    let token = manager.issue_access_token(&alice())?;
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(manager));

    let req = Request::builder()
        .uri("/protected")
        .header(
            header::COOKIE,
            format!("theme=dark; {}={}", ACCESS_TOKEN_COOKIE_NAME, token),
        )
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn header_wins_over_cookie_by_default() -> TestResult {
    let manager = manager();
    let token = manager.issue_access_token(&alice())?;
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(manager));

    let req = Request::builder()
        .uri("/protected")
        .header("Authorization", "invalid-token-xyz")
        .header(
            header::COOKIE,
            format!("{}={}", ACCESS_TOKEN_COOKIE_NAME, token),
        )
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn cookie_first_config_is_honored() -> TestResult {
    let manager = manager();
    let token = manager.issue_access_token(&alice())?;
    let cfg = TokenSourceConfig {
        priority: TokenSourcePriority::CookieFirst,
        header_names: vec!["X-Session-Token".to_string()],
        cookie_names: vec!["sid".to_string()],
    };
    let app = Router::new()
        .route("/protected", get(protected))
        .layer(axum::extract::Extension(cfg))
        .layer(axum::extract::Extension(manager));

    let req = Request::builder()
        .uri("/protected")
        .header("X-Session-Token", "invalid-token-xyz")
        .header(header::COOKIE, format!("sid={}", token))
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn missing_manager_returns_500() -> TestResult {
    let app = Router::new().route("/protected", get(protected));

    let req = Request::builder()
        .uri("/protected")
        .header("Authorization", "any")
        .body(Body::empty())?;

    let resp = app.oneshot(req).await.map_err(|e| match e {})?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}
