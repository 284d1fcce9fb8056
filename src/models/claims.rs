use serde::{Deserialize, Serialize};

/// Identity a login handler hands to the manager when issuing tokens.
///
/// The manager trusts these fields as given; checking them is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

impl SessionUser {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            username: username.into(),
        }
    }
}

/// Claims carried by an access token.
///
/// Profile fields ride along so a request gate can identify the caller without
/// a database round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(rename = "sub")]
    pub subject_id: String,
    #[serde(rename = "jti")]
    pub token_id: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Claims carried by a refresh token: identity and a unique id, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    #[serde(rename = "sub")]
    pub subject_id: String,
    #[serde(rename = "jti")]
    pub token_id: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Tokens returned to a client after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
