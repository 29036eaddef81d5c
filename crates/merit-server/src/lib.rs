//! HTTP server wiring for Merit.
//!
//! Binds the SQLite stores and the local file sink into one
//! [`Backend`], mounts the achievement API beside a health check and a
//! read-only view of the upload directory, and wraps everything in a trace
//! layer.

pub mod error;
pub mod files;

pub use error::{Error, Result};

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, http::StatusCode, routing::get};
use merit_api::ApiState;
use merit_core::{AchievementService, store::Backend};
use merit_store_sqlite::{SqliteContentStore, SqliteReferenceStore};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use files::LocalFileSink;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MERIT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  pub content_store_path:   PathBuf,
  pub reference_store_path: PathBuf,
  #[serde(default = "default_upload_dir")]
  pub upload_dir:           PathBuf,
  /// Public URL prefix of the upload directory.
  #[serde(default = "default_upload_base_url")]
  pub upload_base_url:      String,
  /// Per-request deadline for store calls. `0` disables it.
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }

fn default_upload_base_url() -> String { UPLOADS_ROUTE.into() }

fn default_request_timeout_secs() -> u64 { 30 }

impl ServerConfig {
  pub fn request_timeout(&self) -> Option<Duration> {
    (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
  }
}

/// Route under which the upload directory is served.
pub const UPLOADS_ROUTE: &str = "/uploads";

// ─── Backend ─────────────────────────────────────────────────────────────────

/// The production backend: content and references in separate SQLite files,
/// the directory alongside the references, uploads on local disk.
#[derive(Clone)]
pub struct ServerBackend {
  pub content:    SqliteContentStore,
  pub references: SqliteReferenceStore,
  pub files:      LocalFileSink,
}

impl Backend for ServerBackend {
  type Content = SqliteContentStore;
  type References = SqliteReferenceStore;
  type Directory = SqliteReferenceStore;
  type Files = LocalFileSink;

  fn content(&self) -> &SqliteContentStore { &self.content }

  fn references(&self) -> &SqliteReferenceStore { &self.references }

  fn directory(&self) -> &SqliteReferenceStore { &self.references }

  fn files(&self) -> &LocalFileSink { &self.files }
}

// ─── Router ───────────────────────────────────────────────────────────────────

async fn health() -> StatusCode { StatusCode::OK }

/// Build the full application router over any backend.
pub fn router<B: Backend>(state: Arc<ApiState<B>>, upload_dir: PathBuf) -> Router {
  Router::new()
    .route("/health", get(health))
    .nest_service(UPLOADS_ROUTE, ServeDir::new(upload_dir))
    .merge(merit_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Assemble API state for `backend` according to `config`.
pub fn state<B: Backend>(backend: B, config: &ServerConfig) -> Arc<ApiState<B>> {
  let state = ApiState::new(AchievementService::new(backend));
  Arc::new(match config.request_timeout() {
    Some(t) => state.with_timeout(t),
    None => state,
  })
}
