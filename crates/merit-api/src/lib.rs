//! JSON REST API for Merit.
//!
//! Exposes an axum [`Router`] backed by any [`merit_core::store::Backend`].
//! Authentication, TLS and transport concerns are the caller's
//! responsibility; identity arrives in headers (see [`identity`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = Arc::new(ApiState::new(AchievementService::new(backend)));
//! .nest("/api", merit_api::api_router(state))
//! ```

pub mod achievements;
pub mod admin;
pub mod envelope;
pub mod error;
pub mod identity;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use merit_core::{AchievementService, RequestContext, directory::Caller, store::Backend};

pub use error::ApiError;

/// Upper bound on a multipart attachment request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared handler state.
pub struct ApiState<B> {
  pub service:         AchievementService<B>,
  /// Deadline applied to every request's store calls. `None` disables it.
  pub request_timeout: Option<Duration>,
}

impl<B: Backend> ApiState<B> {
  pub fn new(service: AchievementService<B>) -> Self {
    Self { service, request_timeout: None }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.request_timeout = Some(timeout);
    self
  }

  /// Context for one request, with the deadline starting now.
  pub fn context(&self, caller: Caller) -> RequestContext {
    let ctx = RequestContext::new(caller);
    match self.request_timeout {
      Some(t) => ctx.with_deadline(tokio::time::Instant::now() + t),
      None => ctx,
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<B: Backend>(state: Arc<ApiState<B>>) -> Router<()> {
  Router::new()
    .route("/achievements", get(achievements::list::<B>).post(achievements::create::<B>))
    .route(
      "/achievements/{id}",
      get(achievements::detail::<B>)
        .patch(achievements::update::<B>)
        .delete(achievements::delete::<B>),
    )
    .route("/achievements/{id}/submit", post(achievements::submit::<B>))
    .route("/achievements/{id}/verify", post(achievements::verify::<B>))
    .route("/achievements/{id}/reject", post(achievements::reject::<B>))
    .route(
      "/achievements/{id}/attachments",
      post(achievements::attach::<B>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
    .route("/achievements/{id}/history", get(achievements::history::<B>))
    // Reconciliation
    .route("/admin/achievements/orphans", get(admin::orphans::<B>))
    .route("/admin/achievements/{id}/inspect", get(admin::inspect::<B>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
