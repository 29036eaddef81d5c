//! Achievement references: the relational half of an achievement record.
//!
//! A reference is the authority on ownership and workflow status. It points
//! at exactly one content document via `content_id`, and is never physically
//! removed: deletion is a status value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Workflow state of an achievement. See [`crate::workflow`] for transitions.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AchievementStatus {
  Draft,
  Submitted,
  Verified,
  Rejected,
  Deleted,
}

impl AchievementStatus {
  /// No transition leaves a terminal status.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Verified | Self::Rejected | Self::Deleted)
  }
}

// ─── Reference ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementReference {
  pub id:             Uuid,
  /// The owning student; the only ownership authority.
  pub student_id:     Uuid,
  /// Join key into the content store.
  pub content_id:     Uuid,
  pub status:         AchievementStatus,
  pub submitted_at:   Option<DateTime<Utc>>,
  /// Review timestamp; stamped on both verification and rejection.
  pub verified_at:    Option<DateTime<Utc>>,
  /// User id of the reviewing advisor or admin.
  pub verified_by:    Option<Uuid>,
  pub rejection_note: Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  /// Incremented by the store on every successful update. Updates carrying a
  /// stale version are refused.
  pub version:        i64,
}

/// Input to [`crate::store::ReferenceStore::insert`]. New references always
/// start in [`AchievementStatus::Draft`].
#[derive(Debug, Clone)]
pub struct NewReference {
  pub student_id: Uuid,
  pub content_id: Uuid,
}

impl NewReference {
  pub fn into_reference(self, id: Uuid, now: DateTime<Utc>) -> AchievementReference {
    AchievementReference {
      id,
      student_id: self.student_id,
      content_id: self.content_id,
      status: AchievementStatus::Draft,
      submitted_at: None,
      verified_at: None,
      verified_by: None,
      rejection_note: None,
      created_at: now,
      updated_at: now,
      version: 1,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn status_strings_are_snake_case() {
    assert_eq!(AchievementStatus::Submitted.to_string(), "submitted");
    assert_eq!(
      AchievementStatus::from_str("rejected").unwrap(),
      AchievementStatus::Rejected
    );
    assert!(AchievementStatus::from_str("archived").is_err());
  }

  #[test]
  fn only_draft_and_submitted_are_open() {
    assert!(!AchievementStatus::Draft.is_terminal());
    assert!(!AchievementStatus::Submitted.is_terminal());
    assert!(AchievementStatus::Verified.is_terminal());
    assert!(AchievementStatus::Rejected.is_terminal());
    assert!(AchievementStatus::Deleted.is_terminal());
  }
}
