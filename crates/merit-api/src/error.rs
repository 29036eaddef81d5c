//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use merit_core::Error as CoreError;
use thiserror::Error;

use crate::envelope::Envelope;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Identity headers missing or malformed.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// The request could not be decoded (bad JSON, bad path, bad multipart).
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(e) => match e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::InvalidState { .. } | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      ApiError::Core(CoreError::Store(e)) => {
        tracing::error!(error = %e, "store failure");
        Envelope::error("internal server error", None)
      }
      ApiError::Core(CoreError::Validation(m)) | ApiError::BadRequest(m) => {
        Envelope::error("validation failed", Some(vec![m.clone()]))
      }
      other => Envelope::error(other.to_string(), None),
    };
    (status, Json(body)).into_response()
  }
}
