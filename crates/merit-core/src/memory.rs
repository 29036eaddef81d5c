//! In-process implementations of every store trait.
//!
//! Useful for tests and for embedding. Each store carries a set of fault
//! switches so partial-failure paths can be exercised deterministically.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  achievement::{AchievementContent, NewContent},
  directory::{Lecturer, Student},
  reference::{AchievementReference, AchievementStatus, NewReference},
  store::{
    Backend, ContentStore, FileSink, ReferenceQuery, ReferenceStore, StudentDirectory, Upload,
  },
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("injected failure in {0}")]
  Injected(&'static str),

  #[error("no document with id {0}")]
  MissingDocument(Uuid),

  #[error("content {0} is already referenced")]
  DuplicateContent(Uuid),
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn check(flag: &AtomicBool, what: &'static str) -> Result<(), MemoryError> {
  if flag.load(Ordering::SeqCst) {
    Err(MemoryError::Injected(what))
  } else {
    Ok(())
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ContentFaults {
  pub insert:      AtomicBool,
  pub get:         AtomicBool,
  pub replace:     AtomicBool,
  pub soft_delete: AtomicBool,
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
  docs:              Mutex<HashMap<Uuid, AchievementContent>>,
  pub faults:        ContentFaults,
  soft_delete_calls: AtomicUsize,
}

impl MemoryContentStore {
  /// Number of `soft_delete` calls received, failed ones included.
  pub fn soft_delete_calls(&self) -> usize { self.soft_delete_calls.load(Ordering::SeqCst) }

  pub fn len(&self) -> usize { lock(&self.docs).len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl ContentStore for MemoryContentStore {
  type Error = MemoryError;

  async fn insert(&self, input: NewContent) -> Result<AchievementContent, MemoryError> {
    check(&self.faults.insert, "content insert")?;
    let content = input.into_content(Uuid::new_v4(), Utc::now());
    lock(&self.docs).insert(content.id, content.clone());
    Ok(content)
  }

  async fn get(
    &self,
    id: Uuid,
    include_deleted: bool,
  ) -> Result<Option<AchievementContent>, MemoryError> {
    check(&self.faults.get, "content get")?;
    Ok(
      lock(&self.docs)
        .get(&id)
        .filter(|c| include_deleted || !c.is_deleted)
        .cloned(),
    )
  }

  async fn replace(&self, content: AchievementContent) -> Result<(), MemoryError> {
    check(&self.faults.replace, "content replace")?;
    let mut docs = lock(&self.docs);
    match docs.get_mut(&content.id) {
      Some(slot) => {
        *slot = content;
        Ok(())
      }
      None => Err(MemoryError::MissingDocument(content.id)),
    }
  }

  async fn soft_delete(&self, id: Uuid) -> Result<(), MemoryError> {
    self.soft_delete_calls.fetch_add(1, Ordering::SeqCst);
    check(&self.faults.soft_delete, "content soft delete")?;
    let mut docs = lock(&self.docs);
    let doc = docs.get_mut(&id).ok_or(MemoryError::MissingDocument(id))?;
    if !doc.is_deleted {
      doc.is_deleted = true;
      doc.deleted_at = Some(Utc::now());
    }
    Ok(())
  }

  async fn restore(&self, id: Uuid) -> Result<(), MemoryError> {
    let mut docs = lock(&self.docs);
    let doc = docs.get_mut(&id).ok_or(MemoryError::MissingDocument(id))?;
    doc.is_deleted = false;
    doc.deleted_at = None;
    Ok(())
  }

  async fn live_ids(&self) -> Result<Vec<Uuid>, MemoryError> {
    Ok(
      lock(&self.docs)
        .values()
        .filter(|c| !c.is_deleted)
        .map(|c| c.id)
        .collect(),
    )
  }
}

// ─── References ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ReferenceFaults {
  pub insert: AtomicBool,
  pub update: AtomicBool,
  /// When set, the next `update` finds the row already bumped by another
  /// writer. Cleared after one use.
  pub race:   AtomicBool,
}

#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
  rows:       Mutex<HashMap<Uuid, AchievementReference>>,
  pub faults: ReferenceFaults,
}

impl MemoryReferenceStore {
  /// Overwrite a row bypassing the version check; lets tests simulate a
  /// concurrent writer.
  pub fn force(&self, reference: AchievementReference) {
    lock(&self.rows).insert(reference.content_id, reference);
  }
}

impl ReferenceStore for MemoryReferenceStore {
  type Error = MemoryError;

  async fn insert(&self, input: NewReference) -> Result<AchievementReference, MemoryError> {
    check(&self.faults.insert, "reference insert")?;
    let mut rows = lock(&self.rows);
    if rows.contains_key(&input.content_id) {
      return Err(MemoryError::DuplicateContent(input.content_id));
    }
    let reference = input.into_reference(Uuid::new_v4(), Utc::now());
    rows.insert(reference.content_id, reference.clone());
    Ok(reference)
  }

  async fn by_content_id(
    &self,
    content_id: Uuid,
  ) -> Result<Option<AchievementReference>, MemoryError> {
    Ok(lock(&self.rows).get(&content_id).cloned())
  }

  async fn update(
    &self,
    reference: AchievementReference,
  ) -> Result<Option<AchievementReference>, MemoryError> {
    check(&self.faults.update, "reference update")?;
    let mut rows = lock(&self.rows);
    if self.faults.race.swap(false, Ordering::SeqCst) {
      if let Some(slot) = rows.get_mut(&reference.content_id) {
        slot.version += 1;
      }
    }
    match rows.get_mut(&reference.content_id) {
      Some(slot) if slot.version == reference.version && slot.id == reference.id => {
        *slot = AchievementReference { version: reference.version + 1, ..reference };
        Ok(Some(slot.clone()))
      }
      _ => Ok(None),
    }
  }

  async fn list(&self, query: ReferenceQuery) -> Result<Vec<AchievementReference>, MemoryError> {
    let mut out: Vec<_> = lock(&self.rows)
      .values()
      .filter(|r| {
        query
          .student_ids
          .as_ref()
          .is_none_or(|ids| ids.contains(&r.student_id))
      })
      .filter(|r| query.statuses.is_empty() || query.statuses.contains(&r.status))
      .filter(|r| !(query.exclude_deleted && r.status == AchievementStatus::Deleted))
      .cloned()
      .collect();
    out.sort_by_key(|r| r.created_at);
    Ok(out)
  }
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryDirectory {
  students:  Mutex<Vec<Student>>,
  lecturers: Mutex<Vec<Lecturer>>,
}

impl MemoryDirectory {
  pub fn add_student(&self, student: Student) { lock(&self.students).push(student); }

  pub fn add_lecturer(&self, lecturer: Lecturer) { lock(&self.lecturers).push(lecturer); }
}

impl StudentDirectory for MemoryDirectory {
  type Error = MemoryError;

  async fn student_by_user(&self, user_id: Uuid) -> Result<Option<Student>, MemoryError> {
    Ok(lock(&self.students).iter().find(|s| s.user_id == user_id).cloned())
  }

  async fn student_by_id(&self, student_id: Uuid) -> Result<Option<Student>, MemoryError> {
    Ok(lock(&self.students).iter().find(|s| s.id == student_id).cloned())
  }

  async fn advisee_ids(&self, advisor_user_id: Uuid) -> Result<Vec<Uuid>, MemoryError> {
    let lecturer_id = match lock(&self.lecturers).iter().find(|l| l.user_id == advisor_user_id) {
      Some(l) => l.id,
      None => return Ok(Vec::new()),
    };
    Ok(
      lock(&self.students)
        .iter()
        .filter(|s| s.advisor_id == Some(lecturer_id))
        .map(|s| s.id)
        .collect(),
    )
  }
}

// ─── Files ───────────────────────────────────────────────────────────────────

/// Keeps uploaded bytes in memory and hands out `memory://` URLs.
#[derive(Debug, Default)]
pub struct MemoryFileSink {
  files:     Mutex<HashMap<String, Upload>>,
  pub fail:  AtomicBool,
}

impl MemoryFileSink {
  pub fn get(&self, url: &str) -> Option<Upload> { lock(&self.files).get(url).cloned() }
}

impl FileSink for MemoryFileSink {
  type Error = MemoryError;

  async fn store(&self, owner: String, upload: Upload) -> Result<String, MemoryError> {
    check(&self.fail, "file store")?;
    let url = format!("memory://{owner}/{}/{}", Uuid::new_v4(), upload.file_name);
    lock(&self.files).insert(url.clone(), upload);
    Ok(url)
  }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// All four in-memory stores. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
  pub content:    Arc<MemoryContentStore>,
  pub references: Arc<MemoryReferenceStore>,
  pub directory:  Arc<MemoryDirectory>,
  pub files:      Arc<MemoryFileSink>,
}

impl Backend for MemoryBackend {
  type Content = MemoryContentStore;
  type References = MemoryReferenceStore;
  type Directory = MemoryDirectory;
  type Files = MemoryFileSink;

  fn content(&self) -> &MemoryContentStore { &self.content }

  fn references(&self) -> &MemoryReferenceStore { &self.references }

  fn directory(&self) -> &MemoryDirectory { &self.directory }

  fn files(&self) -> &MemoryFileSink { &self.files }
}
