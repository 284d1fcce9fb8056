//! Token configuration.
//!
//! One secret and one TTL per token kind. [`TokenConfig::from_env`] reads:
//!
//! - `JWT_ACCESS_SECRET` (required)
//! - `JWT_REFRESH_SECRET` (required, must differ from the access secret)
//! - `ACCESS_TOKEN_EXPIRES_IN` (default `15m`)
//! - `REFRESH_TOKEN_EXPIRES_IN` (default `30d`)
//! - `JWT_LEEWAY_SECONDS` (default `0`)
//!
//! TTL values are either a bare number of seconds or a number followed by one of
//! `s`, `m`, `h`, `d`, `w`.

use crate::RSessionError;
use std::env;
use std::time::Duration;

pub const DEFAULT_ACCESS_TTL: &str = "15m";
pub const DEFAULT_REFRESH_TTL: &str = "30d";

#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway: u64,
}

// Secrets stay out of logs.
impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway", &self.leeway)
            .finish()
    }
}

impl TokenConfig {
    /// Builds a config with the default TTLs and no leeway.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            leeway: 0,
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Loads the config from environment variables.
    pub fn from_env() -> Result<Self, RSessionError> {
        let access_secret = required_var("JWT_ACCESS_SECRET")?;
        let refresh_secret = required_var("JWT_REFRESH_SECRET")?;

        let access_ttl = parse_ttl(
            &env::var("ACCESS_TOKEN_EXPIRES_IN").unwrap_or_else(|_| DEFAULT_ACCESS_TTL.to_string()),
        )?;
        let refresh_ttl = parse_ttl(
            &env::var("REFRESH_TOKEN_EXPIRES_IN")
                .unwrap_or_else(|_| DEFAULT_REFRESH_TTL.to_string()),
        )?;
        let leeway = env::var("JWT_LEEWAY_SECONDS")
            .unwrap_or_else(|_| "0".to_string())
            .trim()
            .parse()
            .map_err(|_| RSessionError::Config {
                message: "JWT_LEEWAY_SECONDS must be a non-negative integer".to_string(),
            })?;

        let config = Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
            leeway,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would make tokens unsafe or useless.
    ///
    /// Sharing one secret between both kinds would let a refresh token pass as
    /// an access token, so that is refused outright.
    pub fn validate(&self) -> Result<(), RSessionError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(RSessionError::Config {
                message: "signing secrets must not be empty".to_string(),
            });
        }
        if self.access_secret == self.refresh_secret {
            return Err(RSessionError::Config {
                message: "access and refresh secrets must differ".to_string(),
            });
        }
        if self.access_ttl.is_zero() || self.refresh_ttl.is_zero() {
            return Err(RSessionError::Config {
                message: "token TTLs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn required_var(name: &str) -> Result<String, RSessionError> {
    env::var(name).map_err(|_| RSessionError::Config {
        message: format!("{name} must be set"),
    })
}

/// Parses a TTL such as `900`, `15m`, `12h` or `30d`.
pub fn parse_ttl(raw: &str) -> Result<Duration, RSessionError> {
    let raw = raw.trim();
    let invalid = || RSessionError::Config {
        message: format!("invalid TTL '{raw}'"),
    };

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let amount: u64 = number.parse().map_err(|_| invalid())?;

    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}
