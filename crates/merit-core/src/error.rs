//! Error types for `merit-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{reference::AchievementStatus, workflow::Action};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} not found")]
  NotFound(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("cannot {action} an achievement in status {status}")]
  InvalidState {
    status: AchievementStatus,
    action: Action,
  },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("achievement {0} was modified by another request")]
  Conflict(Uuid),

  #[error("deadline exceeded")]
  DeadlineExceeded,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
