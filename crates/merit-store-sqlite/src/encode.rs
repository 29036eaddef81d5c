//! Encoding and decoding helpers between Merit domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Content documents are stored as compact JSON.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use merit_core::{
  achievement::AchievementContent,
  directory::Student,
  reference::{AchievementReference, AchievementStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(s: AchievementStatus) -> &'static str {
  match s {
    AchievementStatus::Draft => "draft",
    AchievementStatus::Submitted => "submitted",
    AchievementStatus::Verified => "verified",
    AchievementStatus::Rejected => "rejected",
    AchievementStatus::Deleted => "deleted",
  }
}

pub fn decode_status(s: &str) -> Result<AchievementStatus> {
  AchievementStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Content document ────────────────────────────────────────────────────────

pub fn encode_doc(content: &AchievementContent) -> Result<String> {
  Ok(serde_json::to_string(content)?)
}

/// Raw values read from an `achievement_documents` row.
pub struct RawContent {
  pub doc:        String,
  pub is_deleted: bool,
  pub deleted_at: Option<String>,
}

impl RawContent {
  pub fn into_content(self) -> Result<AchievementContent> {
    let mut content: AchievementContent = serde_json::from_str(&self.doc)?;
    content.is_deleted = self.is_deleted;
    content.deleted_at = decode_opt_dt(self.deleted_at)?;
    Ok(content)
  }
}

// ─── Reference row ───────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawReference`].
pub const REFERENCE_COLUMNS: &str = "reference_id, student_id, content_id, status, \
   submitted_at, verified_at, verified_by, rejection_note, created_at, updated_at, version";

/// Raw strings read directly from an `achievement_references` row.
pub struct RawReference {
  pub reference_id:   String,
  pub student_id:     String,
  pub content_id:     String,
  pub status:         String,
  pub submitted_at:   Option<String>,
  pub verified_at:    Option<String>,
  pub verified_by:    Option<String>,
  pub rejection_note: Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
  pub version:        i64,
}

impl RawReference {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reference_id:   row.get(0)?,
      student_id:     row.get(1)?,
      content_id:     row.get(2)?,
      status:         row.get(3)?,
      submitted_at:   row.get(4)?,
      verified_at:    row.get(5)?,
      verified_by:    row.get(6)?,
      rejection_note: row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
      version:        row.get(10)?,
    })
  }

  pub fn into_reference(self) -> Result<AchievementReference> {
    Ok(AchievementReference {
      id:             decode_uuid(&self.reference_id)?,
      student_id:     decode_uuid(&self.student_id)?,
      content_id:     decode_uuid(&self.content_id)?,
      status:         decode_status(&self.status)?,
      submitted_at:   decode_opt_dt(self.submitted_at)?,
      verified_at:    decode_opt_dt(self.verified_at)?,
      verified_by:    decode_opt_uuid(self.verified_by)?,
      rejection_note: self.rejection_note,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
      version:        self.version,
    })
  }
}

// ─── Student row ─────────────────────────────────────────────────────────────

pub const STUDENT_COLUMNS: &str = "student_id, user_id, student_code, full_name, advisor_id";

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub student_id:   String,
  pub user_id:      String,
  pub student_code: String,
  pub full_name:    String,
  pub advisor_id:   Option<String>,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:   row.get(0)?,
      user_id:      row.get(1)?,
      student_code: row.get(2)?,
      full_name:    row.get(3)?,
      advisor_id:   row.get(4)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:           decode_uuid(&self.student_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      student_code: self.student_code,
      full_name:    self.full_name,
      advisor_id:   decode_opt_uuid(self.advisor_id)?,
    })
  }
}
