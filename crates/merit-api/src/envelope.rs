//! The JSON envelope wrapped around every response body.
//!
//! ```json
//! { "status": "success", "message": "achievement created", "data": { … } }
//! { "status": "error", "message": "validation failed", "errors": ["…"] }
//! ```

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
  Success,
  Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub status:  Outcome,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub errors:  Option<Vec<String>>,
}

impl<T: Serialize> Envelope<T> {
  pub fn success(message: impl Into<String>, data: T) -> Self {
    Self { status: Outcome::Success, message: message.into(), data: Some(data), errors: None }
  }
}

impl Envelope<()> {
  pub fn error(message: impl Into<String>, errors: Option<Vec<String>>) -> Self {
    Self { status: Outcome::Error, message: message.into(), data: None, errors }
  }
}

/// `200 OK` with a success envelope.
pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
  (StatusCode::OK, Json(Envelope::success(message, data))).into_response()
}

/// `201 Created` with a success envelope.
pub fn created<T: Serialize>(message: &str, data: T) -> Response {
  (StatusCode::CREATED, Json(Envelope::success(message, data))).into_response()
}
