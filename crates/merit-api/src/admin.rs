//! Reconciliation endpoints for administrators.
//!
//! Create can leave a content document with no reference when the second
//! write fails and its compensation fails too. These endpoints surface such
//! records for manual repair; they never modify anything.

use std::sync::Arc;

use axum::{extract::State, response::Response};
use merit_core::{store::Backend, view::Reconciliation};
use serde::Serialize;

use crate::{
  ApiState,
  envelope::ok,
  error::ApiError,
  identity::{ContentId, Identity},
};

/// `GET /admin/achievements/orphans`
pub async fn orphans<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let orphans = state.service.orphans(&ctx).await?;
  Ok(ok("orphaned content retrieved", orphans))
}

#[derive(Debug, Serialize)]
pub struct InspectView {
  #[serde(flatten)]
  pub record:     Reconciliation,
  pub consistent: bool,
}

/// `GET /admin/achievements/{id}/inspect`
pub async fn inspect<B: Backend>(
  State(state): State<Arc<ApiState<B>>>,
  Identity(caller): Identity,
  ContentId(id): ContentId,
) -> Result<Response, ApiError> {
  let ctx = state.context(caller);
  let record = state.service.inspect(&ctx, id).await?;
  let consistent = record.is_consistent();
  Ok(ok("achievement inspected", InspectView { record, consistent }))
}
