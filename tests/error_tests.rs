//! Error handling tests for r-session.
//!
//! Tests the error types, their HTTP mapping and the rendered body.

use r_session::RSessionError;
use std::error::Error;

#[cfg(test)]
mod error_handling {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            RSessionError::MutexPoisoned.to_string(),
            "refresh registry mutex poisoned"
        );
        assert_eq!(RSessionError::ExpiredToken.to_string(), "token expired");

        let err = RSessionError::UnrecognizedStatus {
            input: "done".to_string(),
            accepted: vec!["new".to_string(), "resolved".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unrecognized status 'done', expected one of: new, resolved"
        );
    }

    #[test]
    fn error_trait_implementation() {
        let error = RSessionError::InvalidToken;
        let _: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn status_codes() {
        assert_eq!(RSessionError::InvalidToken.status_code(), 401);
        assert_eq!(RSessionError::ExpiredToken.status_code(), 401);
        assert_eq!(RSessionError::RevokedToken.status_code(), 401);
        assert_eq!(RSessionError::MissingStatus.status_code(), 400);
        assert_eq!(
            RSessionError::Registry {
                message: "down".to_string()
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn token_failures_share_one_public_message() {
        let invalid = RSessionError::InvalidToken.public_message();
        assert_eq!(invalid, RSessionError::ExpiredToken.public_message());
        assert_eq!(invalid, RSessionError::RevokedToken.public_message());
    }

    #[test]
    fn internal_details_stay_private() {
        let err = RSessionError::Registry {
            message: "connection refused 10.0.0.3:6379".to_string(),
        };
        assert!(!err.public_message().contains("10.0.0.3"));
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}

#[cfg(feature = "actix")]
mod actix_error_tests {
    use super::*;
    use actix_web::{App, HttpResponse, post, test, web};
    use r_session::{SessionTokenManager, TokenConfig};

    #[actix_web::test]
    async fn error_response() {
        #[post("/refresh")]
        async fn refresh_endpoint(
            manager: web::Data<SessionTokenManager>,
            body: String,
        ) -> Result<HttpResponse, RSessionError> {
            manager.authenticate_refresh_token(&body).await?;
            Ok(HttpResponse::Ok().finish())
        }

        let manager =
            SessionTokenManager::new(&TokenConfig::new("err-access", "err-refresh")).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(manager))
                .service(refresh_endpoint),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/refresh")
            .set_payload("garbage")
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[actix_web::test]
    async fn status_error_response() {
        #[post("/status")]
        async fn status_endpoint() -> Result<HttpResponse, RSessionError> {
            Err(RSessionError::MissingStatus)
        }

        let app = test::init_service(App::new().service(status_endpoint)).await;
        let req = test::TestRequest::post().uri("/status").to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "MISSING_STATUS");
    }
}
