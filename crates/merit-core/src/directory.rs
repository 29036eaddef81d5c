//! Caller identity and the student/lecturer directory read model.
//!
//! Directory records are owned elsewhere; this core only reads them to
//! resolve ownership and advisor scope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role an authenticated caller acts in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Student,
  Advisor,
  Admin,
}

impl Role {
  /// Advisors and admins may verify or reject submissions.
  pub fn can_review(self) -> bool { matches!(self, Self::Advisor | Self::Admin) }
}

/// Identity of the user behind a request, validated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
  pub user_id: Uuid,
  pub role:    Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:           Uuid,
  pub user_id:      Uuid,
  /// Registration number shown to humans (e.g. a NIM).
  pub student_code: String,
  pub full_name:    String,
  /// Lecturer id of the academic advisor, if one is assigned.
  pub advisor_id:   Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecturer {
  pub id:            Uuid,
  pub user_id:       Uuid,
  pub lecturer_code: String,
  pub full_name:     String,
}
