//! Handlers for `/achievements` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/achievements` | Scoped to the caller's role |
//! | `POST`   | `/achievements` | Body: [`AchievementInput`]; returns 201 |
//! | `GET`    | `/achievements/{id}` | Detail view |
//! | `PATCH`  | `/achievements/{id}` | Body: [`AchievementInput`]; drafts only |
//! | `DELETE` | `/achievements/{id}` | Drafts only; soft delete |
//! | `POST`   | `/achievements/{id}/submit` | |
//! | `POST`   | `/achievements/{id}/verify` | |
//! | `POST`   | `/achievements/{id}/reject` | Body: `{"note":"..."}` |
//! | `POST`   | `/achievements/{id}/attachments` | Multipart, repeated `files` field |
//! | `GET`    | `/achievements/{id}/history` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State, rejection::JsonRejection},
  response::Response,
};
use merit_core::{AchievementInput, store::Backend, store::Upload};
use serde::Deserialize;

use crate::{
  ApiState,
  envelope::{created, ok},
  error::ApiError,
  identity::{ContentId, Identity},
};

/// Name of the multipart field carrying attachment files.
pub const FILES_FIELD: &str = "files";

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
  payload
    .map(|Json(v)| v)
    .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// ─── Create / update ─────────────────────────────────────────────────────────

/// `POST /achievements`
pub async fn create<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  payload: Result<Json<AchievementInput>, JsonRejection>,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let created_achievement = state.service.create(&ctx, body(payload)?).await?;
  Ok(created("achievement created", created_achievement))
}

/// `PATCH /achievements/{id}`
pub async fn update<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
  payload: Result<Json<AchievementInput>, JsonRejection>,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let content = state.service.update(&ctx, id, body(payload)?).await?;
  Ok(ok("achievement updated", content))
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// `POST /achievements/{id}/submit`
pub async fn submit<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let reference = state.service.submit(&ctx, id).await?;
  Ok(ok("achievement submitted for verification", reference))
}

/// `POST /achievements/{id}/verify`
pub async fn verify<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let reference = state.service.verify(&ctx, id).await?;
  Ok(ok("achievement verified", reference))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  #[serde(default)]
  pub note: String,
}

/// `POST /achievements/{id}/reject`
pub async fn reject<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
  payload: Result<Json<RejectBody>, JsonRejection>,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let RejectBody { note } = body(payload)?;
  let reference = state.service.reject(&ctx, id, note).await?;
  Ok(ok("achievement rejected", reference))
}

/// `DELETE /achievements/{id}`
pub async fn delete<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let reference = state.service.delete(&ctx, id).await?;
  Ok(ok("achievement deleted", reference))
}

// ─── Attachments ─────────────────────────────────────────────────────────────

/// `POST /achievements/{id}/attachments`
///
/// Every part named `files` is stored; other parts are ignored.
pub async fn attach<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
  mut multipart: Multipart,
) -> Result<Response, ApiError> {
  let mut uploads = Vec::new();
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    if field.name() != Some(FILES_FIELD) {
      continue;
    }
    let file_name = field.file_name().unwrap_or("upload").to_owned();
    let content_type = field
      .content_type()
      .unwrap_or("application/octet-stream")
      .to_owned();
    let bytes = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    uploads.push(Upload { file_name, content_type, bytes });
  }

  let ctx = state.context(caller);
  let added = state.service.attach(&ctx, id, uploads).await?;
  Ok(ok("attachments uploaded", added))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /achievements`
pub async fn list<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let items = state.service.list(&ctx).await?;
  Ok(ok("achievements retrieved", items))
}

/// `GET /achievements/{id}`
pub async fn detail<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let detail = state.service.detail(&ctx, id).await?;
  Ok(ok("achievement retrieved", detail))
}

/// `GET /achievements/{id}/history`
pub async fn history<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let events = state.service.history(&ctx, id).await?;
  Ok(ok("history retrieved", events))
}
