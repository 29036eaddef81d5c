//! Read models assembled from a reference and its content. Never stored,
//! always derived.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  achievement::{AchievementContent, AchievementType, Attachment, Details},
  directory::Student,
  reference::{AchievementReference, AchievementStatus},
};

/// Detail keys lifted out of `details` into top-level fields.
pub const EVENT_DATE_KEY: &str = "eventDate";
pub const LOCATION_KEY: &str = "location";
pub const ORGANIZER_KEY: &str = "organizer";

// ─── Created ─────────────────────────────────────────────────────────────────

/// Result of a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedAchievement {
  /// Content id; the public identifier used by every other operation.
  pub id:           Uuid,
  pub reference_id: Uuid,
  pub status:       AchievementStatus,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// One row of a list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementSummary {
  pub id:               Uuid,
  pub reference_id:     Uuid,
  pub status:           AchievementStatus,
  pub student_code:     Option<String>,
  pub student_name:     Option<String>,
  pub title:            String,
  pub achievement_type: AchievementType,
  /// URL of the first attachment, if any.
  pub thumbnail:        Option<String>,
  /// `YYYY-MM-DD` when parseable, the raw value otherwise, empty if absent.
  pub event_date:       String,
  pub updated_at:       DateTime<Utc>,
}

impl AchievementSummary {
  pub fn assemble(
    reference: &AchievementReference,
    content: &AchievementContent,
    student: Option<&Student>,
  ) -> Self {
    Self {
      id:               content.id,
      reference_id:     reference.id,
      status:           reference.status,
      student_code:     student.map(|s| s.student_code.clone()),
      student_name:     student.map(|s| s.full_name.clone()),
      title:            content.title.clone(),
      achievement_type: content.achievement_type.clone(),
      thumbnail:        content.attachments.first().map(|a| a.file_url.clone()),
      event_date:       format_event_date(content.details.get(EVENT_DATE_KEY)),
      updated_at:       content.updated_at,
    }
  }
}

// ─── Detail ──────────────────────────────────────────────────────────────────

/// Full view of one achievement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDetail {
  pub id:               Uuid,
  pub reference_id:     Uuid,
  pub title:            String,
  pub achievement_type: AchievementType,
  pub description:      String,
  pub status:           AchievementStatus,
  pub event_date:       String,
  pub location:         String,
  pub organizer:        String,
  pub attachments:      Vec<Attachment>,
  pub tags:             BTreeSet<String>,
  /// Remaining details after the promoted keys have been removed.
  pub details:          Details,
  pub points:           i64,
  pub rejection_note:   Option<String>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl AchievementDetail {
  pub fn assemble(reference: &AchievementReference, content: AchievementContent) -> Self {
    let mut details = content.details;
    let event_date = format_event_date(details.remove(EVENT_DATE_KEY).as_ref());
    let location = take_string(&mut details, LOCATION_KEY);
    let organizer = take_string(&mut details, ORGANIZER_KEY);

    Self {
      id: content.id,
      reference_id: reference.id,
      title: content.title,
      achievement_type: content.achievement_type,
      description: content.description,
      status: reference.status,
      event_date,
      location,
      organizer,
      attachments: content.attachments,
      tags: content.tags,
      details,
      points: content.points,
      rejection_note: reference.rejection_note.clone(),
      created_at: content.created_at,
      updated_at: content.updated_at,
    }
  }
}

/// Remove `key` and return it if it was a string; non-string values are
/// dropped.
fn take_string(details: &mut Details, key: &str) -> String {
  match details.remove(key) {
    Some(Value::String(s)) => s,
    _ => String::new(),
  }
}

/// Render an event date for display.
pub fn format_event_date(value: Option<&Value>) -> String {
  match value {
    Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
      .map(|dt| dt.format("%Y-%m-%d").to_string())
      .unwrap_or_else(|_| s.clone()),
    _ => String::new(),
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// One entry of the reconstructed status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
  pub status: AchievementStatus,
  pub at:     DateTime<Utc>,
  /// Reviewer user id for verified/rejected entries.
  pub actor:  Option<Uuid>,
  pub note:   Option<String>,
}

/// Project the history of `reference` from its timestamps.
///
/// Always starts with `draft`; adds `submitted` when `submitted_at` is set,
/// then one `verified` or `rejected` entry matching the final status.
pub fn history(reference: &AchievementReference) -> Vec<HistoryEvent> {
  let mut events = vec![HistoryEvent {
    status: AchievementStatus::Draft,
    at:     reference.created_at,
    actor:  None,
    note:   None,
  }];

  if let Some(at) = reference.submitted_at {
    events.push(HistoryEvent {
      status: AchievementStatus::Submitted,
      at,
      actor: None,
      note: None,
    });
  }

  let reviewed_at = reference.verified_at.unwrap_or(reference.updated_at);
  match reference.status {
    AchievementStatus::Verified => events.push(HistoryEvent {
      status: AchievementStatus::Verified,
      at:     reviewed_at,
      actor:  reference.verified_by,
      note:   None,
    }),
    AchievementStatus::Rejected => events.push(HistoryEvent {
      status: AchievementStatus::Rejected,
      at:     reviewed_at,
      actor:  reference.verified_by,
      note:   reference.rejection_note.clone(),
    }),
    AchievementStatus::Draft | AchievementStatus::Submitted | AchievementStatus::Deleted => {}
  }

  events
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// Both halves of an achievement as currently stored, for manual repair of
/// half-written pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
  pub content_id: Uuid,
  /// Included even when soft-deleted.
  pub content:    Option<AchievementContent>,
  pub reference:  Option<AchievementReference>,
}

impl Reconciliation {
  /// Both halves present, and the content is deleted exactly when the
  /// reference says so.
  pub fn is_consistent(&self) -> bool {
    match (&self.content, &self.reference) {
      (Some(c), Some(r)) => c.is_deleted == (r.status == AchievementStatus::Deleted),
      _ => false,
    }
  }
}
