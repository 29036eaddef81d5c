//! [`SqliteContentStore`] and [`SqliteReferenceStore`], the SQLite
//! implementations of the Merit store traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use merit_core::{
  achievement::{AchievementContent, NewContent},
  directory::{Lecturer, Student},
  reference::{AchievementReference, NewReference},
  store::{ContentStore, ReferenceQuery, ReferenceStore, StudentDirectory},
};

use crate::{
  Error, Result,
  encode::{
    REFERENCE_COLUMNS, RawContent, RawReference, RawStudent, STUDENT_COLUMNS, decode_uuid,
    encode_doc, encode_dt, encode_status, encode_uuid,
  },
  schema::{CONTENT_SCHEMA, REFERENCE_SCHEMA},
};

async fn init_schema(conn: &tokio_rusqlite::Connection, schema: &'static str) -> Result<()> {
  conn
    .call(move |conn| {
      conn.execute_batch(schema)?;
      Ok(())
    })
    .await?;
  Ok(())
}

// ─── Content store ───────────────────────────────────────────────────────────

/// Achievement content documents backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteContentStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteContentStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    init_schema(&conn, CONTENT_SCHEMA).await?;
    Ok(Self { conn })
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    init_schema(&conn, CONTENT_SCHEMA).await?;
    Ok(Self { conn })
  }
}

impl ContentStore for SqliteContentStore {
  type Error = Error;

  async fn insert(&self, input: NewContent) -> Result<AchievementContent> {
    let content = input.into_content(Uuid::new_v4(), Utc::now());

    let id_str       = encode_uuid(content.id);
    let student_code = content.student_code.clone();
    let doc          = encode_doc(&content)?;
    let created_str  = encode_dt(content.created_at);
    let updated_str  = encode_dt(content.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievement_documents
             (content_id, student_code, doc, is_deleted, created_at, updated_at)
           VALUES (?1, ?2, ?3, 0, ?4, ?5)",
          rusqlite::params![id_str, student_code, doc, created_str, updated_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(content)
  }

  async fn get(&self, id: Uuid, include_deleted: bool) -> Result<Option<AchievementContent>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawContent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc, is_deleted, deleted_at FROM achievement_documents
               WHERE content_id = ?1 AND (?2 OR is_deleted = 0)",
              rusqlite::params![id_str, include_deleted],
              |row| {
                Ok(RawContent {
                  doc:        row.get(0)?,
                  is_deleted: row.get(1)?,
                  deleted_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContent::into_content).transpose()
  }

  async fn replace(&self, content: AchievementContent) -> Result<()> {
    let id           = content.id;
    let id_str       = encode_uuid(id);
    let student_code = content.student_code.clone();
    let doc          = encode_doc(&content)?;
    let updated_str  = encode_dt(content.updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE achievement_documents
             SET student_code = ?2, doc = ?3, updated_at = ?4
           WHERE content_id = ?1",
          rusqlite::params![id_str, student_code, doc, updated_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::DocumentNotFound(id));
    }
    Ok(())
  }

  async fn soft_delete(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let exists = self
      .conn
      .call(move |conn| {
        // Keep the first deletion timestamp on repeated calls.
        conn.execute(
          "UPDATE achievement_documents
             SET is_deleted = 1, deleted_at = ?2
           WHERE content_id = ?1 AND is_deleted = 0",
          rusqlite::params![id_str, at_str],
        )?;
        let exists = conn
          .query_row(
            "SELECT 1 FROM achievement_documents WHERE content_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(exists)
      })
      .await?;

    if !exists {
      return Err(Error::DocumentNotFound(id));
    }
    Ok(())
  }

  async fn restore(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE achievement_documents
             SET is_deleted = 0, deleted_at = NULL
           WHERE content_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::DocumentNotFound(id));
    }
    Ok(())
  }

  async fn live_ids(&self) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT content_id FROM achievement_documents
           WHERE is_deleted = 0 ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }
}

// ─── Reference store ─────────────────────────────────────────────────────────

/// Achievement references and the student/lecturer directory, backed by a
/// single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteReferenceStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteReferenceStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    init_schema(&conn, REFERENCE_SCHEMA).await?;
    Ok(Self { conn })
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    init_schema(&conn, REFERENCE_SCHEMA).await?;
    Ok(Self { conn })
  }

  // ── Directory writes ──────────────────────────────────────────────────────

  /// Register a lecturer. Directory records are normally provisioned by the
  /// user administration system; this exists for seeding and tests.
  pub async fn insert_lecturer(&self, lecturer: &Lecturer) -> Result<()> {
    let id_str    = encode_uuid(lecturer.id);
    let user_str  = encode_uuid(lecturer.user_id);
    let code      = lecturer.lecturer_code.clone();
    let full_name = lecturer.full_name.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO lecturers (lecturer_id, user_id, lecturer_code, full_name)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, user_str, code, full_name],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Register a student. See [`Self::insert_lecturer`].
  pub async fn insert_student(&self, student: &Student) -> Result<()> {
    let id_str      = encode_uuid(student.id);
    let user_str    = encode_uuid(student.user_id);
    let code        = student.student_code.clone();
    let full_name   = student.full_name.clone();
    let advisor_str = student.advisor_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (student_id, user_id, student_code, full_name, advisor_id)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_str, code, full_name, advisor_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn one_student(&self, column: &'static str, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE {column} = ?1"),
              rusqlite::params![id_str],
              RawStudent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }
}

impl ReferenceStore for SqliteReferenceStore {
  type Error = Error;

  async fn insert(&self, input: NewReference) -> Result<AchievementReference> {
    let reference = input.into_reference(Uuid::new_v4(), Utc::now());

    let id_str      = encode_uuid(reference.id);
    let student_str = encode_uuid(reference.student_id);
    let content_str = encode_uuid(reference.content_id);
    let status_str  = encode_status(reference.status);
    let created_str = encode_dt(reference.created_at);
    let updated_str = encode_dt(reference.updated_at);
    let version     = reference.version;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievement_references
             (reference_id, student_id, content_id, status, created_at, updated_at, version)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            student_str,
            content_str,
            status_str,
            created_str,
            updated_str,
            version,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(reference)
  }

  async fn by_content_id(&self, content_id: Uuid) -> Result<Option<AchievementReference>> {
    let content_str = encode_uuid(content_id);

    let raw: Option<RawReference> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REFERENCE_COLUMNS} FROM achievement_references WHERE content_id = ?1"
              ),
              rusqlite::params![content_str],
              RawReference::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReference::into_reference).transpose()
  }

  async fn update(&self, reference: AchievementReference) -> Result<Option<AchievementReference>> {
    let id_str        = encode_uuid(reference.id);
    let status_str    = encode_status(reference.status);
    let submitted_str = reference.submitted_at.map(encode_dt);
    let verified_str  = reference.verified_at.map(encode_dt);
    let reviewer_str  = reference.verified_by.map(encode_uuid);
    let note          = reference.rejection_note.clone();
    let updated_str   = encode_dt(reference.updated_at);
    let version       = reference.version;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE achievement_references
             SET status = ?2, submitted_at = ?3, verified_at = ?4, verified_by = ?5,
                 rejection_note = ?6, updated_at = ?7, version = version + 1
           WHERE reference_id = ?1 AND version = ?8",
          rusqlite::params![
            id_str,
            status_str,
            submitted_str,
            verified_str,
            reviewer_str,
            note,
            updated_str,
            version,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    Ok(Some(AchievementReference { version: version + 1, ..reference }))
  }

  async fn list(&self, query: ReferenceQuery) -> Result<Vec<AchievementReference>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if let Some(ids) = &query.student_ids {
      if ids.is_empty() {
        return Ok(Vec::new());
      }
      let marks = placeholders(params.len(), ids.len());
      clauses.push(format!("student_id IN ({marks})"));
      params.extend(ids.iter().copied().map(encode_uuid));
    }
    if !query.statuses.is_empty() {
      let marks = placeholders(params.len(), query.statuses.len());
      clauses.push(format!("status IN ({marks})"));
      params.extend(query.statuses.iter().map(|s| encode_status(*s).to_owned()));
    }
    if query.exclude_deleted {
      clauses.push("status != 'deleted'".to_owned());
    }

    let where_clause = if clauses.is_empty() {
      String::new()
    } else {
      format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
      "SELECT {REFERENCE_COLUMNS} FROM achievement_references{where_clause} ORDER BY created_at"
    );

    let raws: Vec<RawReference> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawReference::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReference::into_reference).collect()
  }
}

/// `?n, ?n+1, …` for `count` parameters following `offset` already bound ones.
fn placeholders(offset: usize, count: usize) -> String {
  (offset + 1..=offset + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── StudentDirectory impl ───────────────────────────────────────────────────

impl StudentDirectory for SqliteReferenceStore {
  type Error = Error;

  async fn student_by_user(&self, user_id: Uuid) -> Result<Option<Student>> {
    self.one_student("user_id", user_id).await
  }

  async fn student_by_id(&self, student_id: Uuid) -> Result<Option<Student>> {
    self.one_student("student_id", student_id).await
  }

  async fn advisee_ids(&self, advisor_user_id: Uuid) -> Result<Vec<Uuid>> {
    let user_str = encode_uuid(advisor_user_id);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.student_id FROM students s
           JOIN lecturers l ON l.lecturer_id = s.advisor_id
           WHERE l.user_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }
}
