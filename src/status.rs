//! Defect status normalization.
//!
//! Callers send statuses in whatever language and casing their UI uses. The
//! [`StatusNormalizer`] folds them onto the closed [`CanonicalStatus`] set through
//! an alias table it owns, so swapping locales means building a different
//! normalizer rather than touching call sites.
//!
//! Two call-site policies sit on top of [`StatusNormalizer::normalize`]:
//!
//! - creating a defect falls back to [`CanonicalStatus::New`] when the status is
//!   absent or unrecognized ([`StatusNormalizer::status_for_create`]);
//! - updating a status rejects anything that does not match
//!   ([`StatusNormalizer::status_for_update`]).

use crate::RSessionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle stage of a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalStatus {
    New,
    InProgress,
    Resolved,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 3] = [
        CanonicalStatus::New,
        CanonicalStatus::InProgress,
        CanonicalStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalStatus::New => "new",
            CanonicalStatus::InProgress => "in-progress",
            CanonicalStatus::Resolved => "resolved",
        }
    }

}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const DEFAULT_ALIASES: &[(&str, CanonicalStatus)] = &[
    ("new", CanonicalStatus::New),
    ("nowy", CanonicalStatus::New),
    ("in progress", CanonicalStatus::InProgress),
    ("in_progress", CanonicalStatus::InProgress),
    ("in-progress", CanonicalStatus::InProgress),
    ("w trakcie", CanonicalStatus::InProgress),
    ("resolved", CanonicalStatus::Resolved),
    ("solved", CanonicalStatus::Resolved),
    ("repaired", CanonicalStatus::Resolved),
    ("naprawiony", CanonicalStatus::Resolved),
];

/// Maps free-form status strings onto [`CanonicalStatus`].
///
/// The alias table is fixed at construction.
#[derive(Debug, Clone)]
pub struct StatusNormalizer {
    aliases: HashMap<String, CanonicalStatus>,
}

impl Default for StatusNormalizer {
    fn default() -> Self {
        Self::with_aliases(DEFAULT_ALIASES.iter().copied())
    }
}

impl StatusNormalizer {
    /// Normalizer with the built-in English and Polish aliases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalizer from a custom alias table.
    ///
    /// Keys are lower-cased and trimmed the same way inputs are.
    pub fn with_aliases<'a, I>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, CanonicalStatus)>,
    {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(alias, status)| (fold(alias), status))
                .collect(),
        }
    }

    /// Accepted aliases, sorted.
    pub fn accepted(&self) -> Vec<String> {
        let mut accepted: Vec<String> = self.aliases.keys().cloned().collect();
        accepted.sort();
        accepted
    }

    /// Resolves `input` to a canonical status.
    ///
    /// - `None` or `""` gives `Ok(None)`: no value was supplied.
    /// - A known alias gives `Ok(Some(status))`.
    /// - Anything else is [`RSessionError::UnrecognizedStatus`].
    pub fn normalize(&self, input: Option<&str>) -> Result<Option<CanonicalStatus>, RSessionError> {
        let Some(raw) = input.filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };

        match self.aliases.get(&fold(raw)) {
            Some(status) => Ok(Some(*status)),
            None => Err(RSessionError::UnrecognizedStatus {
                input: raw.to_string(),
                accepted: self.accepted(),
            }),
        }
    }

    /// Status for a newly created defect; absent or unknown input becomes `New`.
    pub fn status_for_create(&self, input: Option<&str>) -> CanonicalStatus {
        match self.normalize(input) {
            Ok(Some(status)) => status,
            Ok(None) => CanonicalStatus::New,
            Err(e) => {
                tracing::debug!(error = %e, "defaulting defect status to new");
                CanonicalStatus::New
            }
        }
    }

    /// Status for an update; absent input is [`RSessionError::MissingStatus`]
    /// and unknown input is [`RSessionError::UnrecognizedStatus`].
    pub fn status_for_update(&self, input: Option<&str>) -> Result<CanonicalStatus, RSessionError> {
        self.normalize(input)?.ok_or(RSessionError::MissingStatus)
    }
}

fn fold(raw: &str) -> String {
    raw.trim().to_lowercase()
}
