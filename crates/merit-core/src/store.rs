//! Storage and collaborator traits.
//!
//! The traits are implemented by storage backends (e.g. `merit-store-sqlite`)
//! and by [`crate::memory`]. The lifecycle service depends on these
//! abstractions, never on a concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use bytes::Bytes;
use uuid::Uuid;

use crate::{
  achievement::{AchievementContent, NewContent},
  directory::Student,
  reference::{AchievementReference, AchievementStatus, NewReference},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ReferenceStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceQuery {
  /// Restrict to references owned by these students. `None` means all
  /// students; `Some(vec![])` matches nothing.
  pub student_ids:     Option<Vec<Uuid>>,
  /// Restrict to these statuses. Empty means any status.
  pub statuses:        Vec<AchievementStatus>,
  /// Leave out references in [`AchievementStatus::Deleted`].
  pub exclude_deleted: bool,
}

// ─── Content store ───────────────────────────────────────────────────────────

/// Document store holding achievement content.
pub trait ContentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new document and return it with its generated id.
  fn insert(
    &self,
    input: NewContent,
  ) -> impl Future<Output = Result<AchievementContent, Self::Error>> + Send + '_;

  /// Fetch a document. Soft-deleted documents are only returned when
  /// `include_deleted` is set.
  fn get(
    &self,
    id: Uuid,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Option<AchievementContent>, Self::Error>> + Send + '_;

  /// Overwrite the whole document with `content`. Errors if no document with
  /// that id exists.
  fn replace(
    &self,
    content: AchievementContent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark a document deleted. Idempotent; the document stays resolvable with
  /// `include_deleted`.
  fn soft_delete(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear the deletion mark set by [`soft_delete`](Self::soft_delete).
  /// Idempotent; errors if no document with that id exists.
  fn restore(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Ids of every document that is not soft-deleted.
  fn live_ids(&self) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}

// ─── Reference store ─────────────────────────────────────────────────────────

/// Relational store holding achievement references.
pub trait ReferenceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new draft reference. Fails if `content_id` is already
  /// referenced.
  fn insert(
    &self,
    input: NewReference,
  ) -> impl Future<Output = Result<AchievementReference, Self::Error>> + Send + '_;

  fn by_content_id(
    &self,
    content_id: Uuid,
  ) -> impl Future<Output = Result<Option<AchievementReference>, Self::Error>> + Send + '_;

  /// Full-row overwrite guarded by `reference.version`.
  ///
  /// Returns the stored row (with its version incremented), or `None` if the
  /// row is missing or its version no longer matches.
  fn update(
    &self,
    reference: AchievementReference,
  ) -> impl Future<Output = Result<Option<AchievementReference>, Self::Error>> + Send + '_;

  fn list(
    &self,
    query: ReferenceQuery,
  ) -> impl Future<Output = Result<Vec<AchievementReference>, Self::Error>> + Send + '_;
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Read-only view of the student/lecturer directory.
pub trait StudentDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn student_by_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn student_by_id(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Student ids advised by the lecturer whose user id is `advisor_user_id`.
  fn advisee_ids(
    &self,
    advisor_user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}

// ─── File sink ───────────────────────────────────────────────────────────────

/// A file received from a client, not yet persisted.
#[derive(Debug, Clone)]
pub struct Upload {
  pub file_name:    String,
  pub content_type: String,
  pub bytes:        Bytes,
}

/// Durable storage for attachment bytes.
pub trait FileSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `upload` under the `owner` namespace and return a stable URL.
  fn store(
    &self,
    owner: String,
    upload: Upload,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Bundles the collaborators the lifecycle service composes.
pub trait Backend: Send + Sync + 'static {
  type Content: ContentStore;
  type References: ReferenceStore;
  type Directory: StudentDirectory;
  type Files: FileSink;

  fn content(&self) -> &Self::Content;
  fn references(&self) -> &Self::References;
  fn directory(&self) -> &Self::Directory;
  fn files(&self) -> &Self::Files;
}
