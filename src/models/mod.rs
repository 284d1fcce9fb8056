//! Data types shared across the crate.
//!
//! This module contains the error type, token claims, and the registry record.

mod claims;
mod registry_entry;
mod session_error;

pub use claims::{AccessTokenClaims, RefreshTokenClaims, SessionUser, TokenPair};
pub use registry_entry::RefreshRegistryEntry;
pub use session_error::RSessionError;
