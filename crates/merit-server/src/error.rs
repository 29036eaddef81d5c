//! Error type for `merit-server`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A name that would escape the upload directory once used as a path.
  #[error("unusable file name: {0:?}")]
  InvalidName(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
