//! Defect records and their status transitions.
//!
//! Storage is someone else's job; these types give the create and update
//! status policies of [`StatusNormalizer`] a concrete record to act on.

use crate::RSessionError;
use crate::status::{CanonicalStatus, StatusNormalizer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload of a create-defect request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDefect {
    pub property_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub image_filenames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectComment {
    pub id: String,
    pub message: String,
    /// User id of the author.
    pub author: String,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defect {
    pub id: String,
    pub property_id: String,
    pub title: String,
    pub description: String,
    pub status: CanonicalStatus,
    pub image_filenames: Vec<String>,
    pub comments: Vec<DefectComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Defect {
    /// Builds a defect from a create request.
    ///
    /// Title and description are trimmed. The status never fails here: absent or
    /// unrecognized values become [`CanonicalStatus::New`].
    pub fn create(input: NewDefect, normalizer: &StatusNormalizer) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: normalizer.status_for_create(input.status.as_deref()),
            property_id: input.property_id,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            image_filenames: input.image_filenames,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the defect to the status named by `input`.
    ///
    /// Unlike [`Defect::create`], unmatched or missing input is an error and the
    /// record is left unchanged.
    pub fn update_status(
        &mut self,
        input: Option<&str>,
        normalizer: &StatusNormalizer,
    ) -> Result<CanonicalStatus, RSessionError> {
        let status = normalizer.status_for_update(input)?;
        if status != self.status {
            tracing::debug!(defect_id = %self.id, from = %self.status, to = %status, "defect status changed");
            self.status = status;
        }
        self.updated_at = Utc::now();
        Ok(status)
    }

    /// Appends a comment and returns its id.
    pub fn add_comment(
        &mut self,
        author: &str,
        message: &str,
        attachments: Vec<String>,
    ) -> String {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        self.comments.push(DefectComment {
            id: id.clone(),
            message: message.trim().to_string(),
            author: author.to_string(),
            attachments,
            created_at: now,
        });
        self.updated_at = now;
        id
    }

    /// Comments, newest first.
    pub fn recent_comments(&self) -> Vec<&DefectComment> {
        let mut comments: Vec<&DefectComment> = self.comments.iter().collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: Option<&str>) -> NewDefect {
        NewDefect {
            property_id: "prop-1".to_string(),
            title: "  Broken pipe ".to_string(),
            description: "Bathroom".to_string(),
            status: status.map(str::to_string),
            image_filenames: vec!["a.jpg".to_string(), "b.png".to_string()],
        }
    }

    #[test]
    fn create_normalizes_or_defaults() {
        let normalizer = StatusNormalizer::new();

        let defect = Defect::create(request(Some("W TRAKCIE")), &normalizer);
        assert_eq!(defect.status, CanonicalStatus::InProgress);
        assert_eq!(defect.title, "Broken pipe");
        assert_eq!(defect.image_filenames.len(), 2);

        let defaulted = Defect::create(request(Some("whatever")), &normalizer);
        assert_eq!(defaulted.status, CanonicalStatus::New);

        let absent = Defect::create(request(None), &normalizer);
        assert_eq!(absent.status, CanonicalStatus::New);
    }

    #[test]
    fn update_rejects_unknown_and_keeps_status() {
        let normalizer = StatusNormalizer::new();
        let mut defect = Defect::create(request(None), &normalizer);

        assert!(defect.update_status(Some("whatever"), &normalizer).is_err());
        assert_eq!(defect.status, CanonicalStatus::New);

        assert_eq!(
            defect.update_status(Some("solved"), &normalizer).ok(),
            Some(CanonicalStatus::Resolved)
        );
        assert_eq!(defect.status, CanonicalStatus::Resolved);
    }

    #[test]
    fn comments_are_listed_newest_first() {
        let normalizer = StatusNormalizer::new();
        let mut defect = Defect::create(request(None), &normalizer);

        let first = defect.add_comment("u1", " first ", Vec::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = defect.add_comment("u2", "second", vec!["photo.jpg".to_string()]);

        let ids: Vec<&str> = defect
            .recent_comments()
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
        assert_eq!(defect.comments.first().map(|c| c.message.as_str()), Some("first"));
    }

    #[test]
    fn create_payload_deserializes_from_camel_case() -> Result<(), serde_json::Error> {
        let input: NewDefect = serde_json::from_str(
            r#"{"propertyId":"p1","title":"Leak","description":"Kitchen","status":"nowy"}"#,
        )?;
        assert_eq!(input.property_id, "p1");
        assert_eq!(input.status.as_deref(), Some("nowy"));
        assert!(input.image_filenames.is_empty());
        Ok(())
    }
}
