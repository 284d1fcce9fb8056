//! Error types for r-session.
//!
//! Token failures (`InvalidToken`, `ExpiredToken`, `RevokedToken`) are kept
//! distinct for callers and logs, but render the same message to HTTP clients
//! so a response never reveals which check rejected the token.
//!
//! ## 日本語
//!
//! r-session のエラー型です。
//!
//! token 系のエラーは呼び出し側とログでは区別しますが、HTTP クライアントには同じ
//! メッセージを返し、どの検証で失敗したかを漏らしません。

/// Message shown to clients for every token failure.
pub(crate) const REAUTHENTICATE: &str = "Invalid or expired token, please sign in again";

/// Errors returned by r-session.
///
/// ## 日本語
///
/// r-session が返すエラーの集合。
#[derive(Debug, thiserror::Error)]
pub enum RSessionError {
    /// Bad signature, malformed token, or claims that do not deserialize.
    #[error("invalid token")]
    InvalidToken,

    /// Signature is valid but the token is past its `exp`.
    #[error("token expired")]
    ExpiredToken,

    /// Refresh token is valid and unexpired but no longer registered.
    #[error("refresh token revoked")]
    RevokedToken,

    /// The status string matched no alias.
    #[error("unrecognized status '{input}', expected one of: {}", .accepted.join(", "))]
    UnrecognizedStatus {
        input: String,
        accepted: Vec<String>,
    },

    /// A status was required but none was given.
    #[error("status is required")]
    MissingStatus,

    /// Token configuration is unusable.
    #[error("invalid token configuration: {message}")]
    Config { message: String },

    /// Signing a token failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// The in-memory registry mutex has been poisoned.
    ///
    /// ## 日本語
    ///
    /// 内部 mutex が poisoned になった。
    #[error("refresh registry mutex poisoned")]
    MutexPoisoned,

    /// The external registry store failed.
    #[error("refresh registry error: {message}")]
    Registry { message: String },
}

impl RSessionError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RSessionError::InvalidToken
            | RSessionError::ExpiredToken
            | RSessionError::RevokedToken => 401,
            RSessionError::UnrecognizedStatus { .. } | RSessionError::MissingStatus => 400,
            RSessionError::Config { .. }
            | RSessionError::Signing(_)
            | RSessionError::MutexPoisoned
            | RSessionError::Registry { .. } => 500,
        }
    }

    /// Machine readable error code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            RSessionError::InvalidToken
            | RSessionError::ExpiredToken
            | RSessionError::RevokedToken => "UNAUTHORIZED",
            RSessionError::UnrecognizedStatus { .. } => "UNRECOGNIZED_STATUS",
            RSessionError::MissingStatus => "MISSING_STATUS",
            RSessionError::Config { .. }
            | RSessionError::Signing(_)
            | RSessionError::MutexPoisoned
            | RSessionError::Registry { .. } => "INTERNAL_ERROR",
        }
    }

    /// Message that is safe to send to a client.
    ///
    /// Token rejections collapse into one message, status errors keep their
    /// detail so the caller can pick a valid value, internal errors are hidden.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            401 => REAUTHENTICATE.to_string(),
            400 => self.to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        })
    }
}

#[cfg(feature = "actix")]
impl actix_web::ResponseError for RSessionError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(RSessionError::status_code(self))
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        if RSessionError::status_code(self) >= 500 {
            tracing::error!(error = %self, "request failed");
        }
        actix_web::HttpResponse::build(actix_web::ResponseError::status_code(self)).json(self.body())
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for RSessionError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, axum::Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_share_one_public_message() {
        let messages: Vec<String> = [
            RSessionError::InvalidToken,
            RSessionError::ExpiredToken,
            RSessionError::RevokedToken,
        ]
        .iter()
        .map(RSessionError::public_message)
        .collect();

        assert!(messages.iter().all(|m| m == REAUTHENTICATE));
    }

    #[test]
    fn unrecognized_status_lists_accepted_values() {
        let err = RSessionError::UnrecognizedStatus {
            input: "bogus".to_string(),
            accepted: vec!["new".to_string(), "resolved".to_string()],
        };

        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.public_message(),
            "unrecognized status 'bogus', expected one of: new, resolved"
        );
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = RSessionError::Registry {
            message: "connection refused".to_string(),
        };

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
