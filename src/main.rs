//! # r-session Example Application
//!
//! A demonstration of r-session in an actix-web application.
//!
//! This example shows how to:
//! - issue an access/refresh token pair at login
//! - protect routes using the `AuthUser` extractor
//! - rotate and revoke refresh tokens
//! - create defects and update their status through the `StatusNormalizer`
//!
//! ## Quick Start
//!
//! 1. **Start the server**:
//!    ```bash
//!    JWT_ACCESS_SECRET=dev-access JWT_REFRESH_SECRET=dev-refresh cargo run
//!    ```
//!
//! 2. **Login to get tokens** (credentials are not checked in this demo):
//!    ```bash
//!    curl -X POST http://127.0.0.1:8080/user/login \
//!      -H "Content-Type: application/json" \
//!      -d '{"id":"u1","email":"a@b.com","username":"alice"}'
//!    ```
//!
//! 3. **Access a protected endpoint**:
//!    ```bash
//!    curl -H "Authorization: Bearer <accessToken>" http://127.0.0.1:8080/me
//!    ```
//!
//! 4. **Report a defect and move it along**:
//!    ```bash
//!    curl -X POST -H "Authorization: Bearer <accessToken>" \
//!      -H "Content-Type: application/json" \
//!      -d '{"propertyId":"p1","title":"Leak","description":"Kitchen","status":"nowy"}' \
//!      http://127.0.0.1:8080/defects
//!    curl -X PATCH -H "Authorization: Bearer <accessToken>" \
//!      -H "Content-Type: application/json" -d '{"status":"in progress"}' \
//!      http://127.0.0.1:8080/defects/<id>/status
//!    ```

use actix_web::{HttpResponse, HttpServer, get, patch, post, web};
use r_session::{
    AuthUser, Defect, NewDefect, RSessionError, SessionTokenManager, SessionUser,
    StatusNormalizer, TokenConfig,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Users seen at login, so refresh can rebuild the profile claims.
#[derive(Default)]
struct Directory {
    users: RwLock<HashMap<String, SessionUser>>,
}

#[derive(Default)]
struct DefectStore {
    defects: RwLock<HashMap<String, Defect>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: Option<String>,
}

fn poisoned<T>(_: T) -> RSessionError {
    RSessionError::MutexPoisoned
}

#[post("/user/login")]
async fn login(
    manager: web::Data<SessionTokenManager>,
    directory: web::Data<Directory>,
    user: web::Json<SessionUser>,
) -> Result<HttpResponse, RSessionError> {
    let user = user.into_inner();
    let tokens = manager.issue_token_pair(&user).await?;
    tracing::info!(user_id = %user.id, "login");
    directory
        .users
        .write()
        .map_err(poisoned)?
        .insert(user.id.clone(), user.clone());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": user,
        "tokens": tokens,
    })))
}

#[post("/auth/refresh")]
async fn refresh(
    manager: web::Data<SessionTokenManager>,
    directory: web::Data<Directory>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, RSessionError> {
    let claims = manager.authenticate_refresh_token(&body.refresh_token).await?;
    let user = directory
        .users
        .read()
        .map_err(poisoned)?
        .get(&claims.subject_id)
        .cloned()
        .ok_or(RSessionError::RevokedToken)?;

    let tokens = manager.rotate_refresh_token(&body.refresh_token, &user).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[post("/auth/logout")]
async fn logout(
    manager: web::Data<SessionTokenManager>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, RSessionError> {
    // An unusable refresh token means there is nothing left to revoke.
    if let Ok(claims) = manager.verify_refresh_token(&body.refresh_token) {
        manager.revoke_refresh_token(&claims.token_id).await?;
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

#[get("/me")]
async fn me(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
    }))
}

#[post("/defects")]
async fn add_defect(
    _user: AuthUser,
    normalizer: web::Data<StatusNormalizer>,
    store: web::Data<DefectStore>,
    body: web::Json<NewDefect>,
) -> Result<HttpResponse, RSessionError> {
    let defect = Defect::create(body.into_inner(), &normalizer);
    store
        .defects
        .write()
        .map_err(poisoned)?
        .insert(defect.id.clone(), defect.clone());
    Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "defect": defect })))
}

#[patch("/defects/{id}/status")]
async fn update_defect_status(
    _user: AuthUser,
    normalizer: web::Data<StatusNormalizer>,
    store: web::Data<DefectStore>,
    path: web::Path<String>,
    body: web::Json<StatusUpdate>,
) -> Result<HttpResponse, RSessionError> {
    let mut defects = store.defects.write().map_err(poisoned)?;
    let Some(defect) = defects.get_mut(path.as_str()) else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({ "success": false })));
    };
    defect.update_status(body.status.as_deref(), &normalizer)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "defect": defect })))
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "r_session=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TokenConfig::from_env()?;
    tracing::info!(?config, "loaded token config");

    // One manager for every worker; clones share the registry.
    let manager = SessionTokenManager::new(&config)?;
    let normalizer = web::Data::new(StatusNormalizer::new());
    let directory = web::Data::new(Directory::default());
    let store = web::Data::new(DefectStore::default());

    tracing::info!("r-session server listening on http://127.0.0.1:8080");

    HttpServer::new(move || {
        actix_web::App::new()
            .app_data(web::Data::new(manager.clone()))
            .app_data(normalizer.clone())
            .app_data(directory.clone())
            .app_data(store.clone())
            .service(login)
            .service(refresh)
            .service(logout)
            .service(me)
            .service(add_defect)
            .service(update_defect_status)
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await?;
    Ok(())
}
