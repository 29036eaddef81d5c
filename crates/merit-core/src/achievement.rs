//! Achievement content: the document half of an achievement record.
//!
//! Content is free-form: a title, a type, a detail mapping whose permitted
//! keys depend on the type, tags and attachment metadata. Ownership and
//! workflow status do not live here; see [`crate::reference`].

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field name → value mapping stored under `details`.
pub type Details = serde_json::Map<String, serde_json::Value>;

// ─── Achievement type ────────────────────────────────────────────────────────

/// The kind of achievement a record describes.
///
/// The four known kinds each carry an allow-list of detail fields. Any other
/// string is preserved as [`AchievementType::Other`] and has an empty
/// allow-list, so its details are always dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AchievementType {
  Competition,
  Publication,
  Organization,
  Certification,
  /// Escape hatch for types that don't fit the taxonomy.
  Other(String),
}

impl AchievementType {
  pub fn parse(s: &str) -> Self {
    match s {
      "competition" => Self::Competition,
      "publication" => Self::Publication,
      "organization" => Self::Organization,
      "certification" => Self::Certification,
      other => Self::Other(other.to_owned()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Competition => "competition",
      Self::Publication => "publication",
      Self::Organization => "organization",
      Self::Certification => "certification",
      Self::Other(s) => s,
    }
  }

  /// Detail keys that may be persisted for this type.
  pub fn allowed_detail_fields(&self) -> &'static [&'static str] {
    match self {
      Self::Competition => &[
        "competition_name",
        "competition_level",
        "rank",
        "medalType",
        "eventDate",
        "location",
        "organizer",
      ],
      Self::Publication => &[
        "publication_type",
        "publication_title",
        "authors",
        "publisher",
        "issn",
      ],
      Self::Organization => &["organization_name", "position", "period"],
      Self::Certification => &[
        "certification_name",
        "issuedBy",
        "certification_number",
        "validUntil",
      ],
      Self::Other(_) => &[],
    }
  }

  pub fn is_known(&self) -> bool { !matches!(self, Self::Other(_)) }
}

impl From<String> for AchievementType {
  fn from(s: String) -> Self { Self::parse(&s) }
}

impl From<AchievementType> for String {
  fn from(t: AchievementType) -> Self { t.as_str().to_owned() }
}

impl fmt::Display for AchievementType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

/// Metadata for an uploaded file. The bytes live wherever the
/// [`FileSink`](crate::store::FileSink) put them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub file_name:   String,
  pub file_url:    String,
  pub file_type:   String,
  pub uploaded_at: DateTime<Utc>,
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// A stored achievement document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementContent {
  /// Generated by the content store on insert.
  pub id:               Uuid,
  /// Informational owner tag; the authoritative owner is
  /// [`AchievementReference::student_id`](crate::reference::AchievementReference::student_id).
  pub student_code:     String,
  pub achievement_type: AchievementType,
  pub title:            String,
  pub description:      String,
  pub details:          Details,
  pub tags:             BTreeSet<String>,
  /// Append-only in normal flow.
  pub attachments:      Vec<Attachment>,
  pub points:           i64,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  pub is_deleted:       bool,
  pub deleted_at:       Option<DateTime<Utc>>,
}

// ─── NewContent ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::ContentStore::insert`].
///
/// The store assigns `id` and both timestamps, starts with no attachments and
/// zero points.
#[derive(Debug, Clone)]
pub struct NewContent {
  pub student_code:     String,
  pub achievement_type: AchievementType,
  pub title:            String,
  pub description:      String,
  /// Must already be sanitized and filtered for `achievement_type`.
  pub details:          Details,
  pub tags:             BTreeSet<String>,
}

impl NewContent {
  /// Materialise the document the store will persist.
  pub fn into_content(self, id: Uuid, now: DateTime<Utc>) -> AchievementContent {
    AchievementContent {
      id,
      student_code: self.student_code,
      achievement_type: self.achievement_type,
      title: self.title,
      description: self.description,
      details: self.details,
      tags: self.tags,
      attachments: Vec::new(),
      points: 0,
      created_at: now,
      updated_at: now,
      is_deleted: false,
      deleted_at: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_types_roundtrip_through_strings() {
    for name in ["competition", "publication", "organization", "certification"] {
      let t = AchievementType::parse(name);
      assert!(t.is_known());
      assert_eq!(t.as_str(), name);
    }
  }

  #[test]
  fn unknown_type_is_preserved_with_empty_allow_list() {
    let t: AchievementType =
      serde_json::from_value(serde_json::json!("Kompetisi")).unwrap();
    assert_eq!(t, AchievementType::Other("Kompetisi".into()));
    assert!(t.allowed_detail_fields().is_empty());
    assert_eq!(serde_json::to_value(&t).unwrap(), "Kompetisi");
  }
}
