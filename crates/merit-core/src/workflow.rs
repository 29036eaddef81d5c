//! The achievement workflow state machine.
//!
//! ```text
//!   draft ──submit──▶ submitted ──verify──▶ verified
//!     │                   └──────reject──▶ rejected
//!     └──delete──▶ deleted
//! ```
//!
//! `update` is a guarded self-loop on `draft`. Verified, rejected and deleted
//! are terminal.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, reference::AchievementStatus};

/// Who may perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
  /// The student who owns the reference.
  Owner,
  /// An advisor or admin.
  Reviewer,
}

/// A guarded operation on an achievement.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
  Update,
  Submit,
  Verify,
  Reject,
  Delete,
}

impl Action {
  /// The only status this action may be applied in.
  pub fn source(self) -> AchievementStatus {
    match self {
      Self::Update | Self::Submit | Self::Delete => AchievementStatus::Draft,
      Self::Verify | Self::Reject => AchievementStatus::Submitted,
    }
  }

  /// The status after the action succeeds.
  pub fn target(self) -> AchievementStatus {
    match self {
      Self::Update => AchievementStatus::Draft,
      Self::Submit => AchievementStatus::Submitted,
      Self::Verify => AchievementStatus::Verified,
      Self::Reject => AchievementStatus::Rejected,
      Self::Delete => AchievementStatus::Deleted,
    }
  }

  pub fn authority(self) -> Authority {
    match self {
      Self::Update | Self::Submit | Self::Delete => Authority::Owner,
      Self::Verify | Self::Reject => Authority::Reviewer,
    }
  }
}

/// Apply `action` to `current`, returning the next status or
/// [`Error::InvalidState`].
pub fn transition(current: AchievementStatus, action: Action) -> Result<AchievementStatus> {
  if current == action.source() {
    Ok(action.target())
  } else {
    Err(Error::InvalidState { status: current, action })
  }
}
