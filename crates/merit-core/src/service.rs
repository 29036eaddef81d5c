//! [`AchievementService`]: the achievement lifecycle orchestrator.
//!
//! Every mutating operation follows the same shape: resolve the caller, load
//! the reference, check authority then state, write the content store, write
//! the reference store, and settle any partial failure through the
//! [`saga`](crate::saga) compensation table. Store calls within one operation
//! are strictly sequential.

use std::{collections::HashMap, future::Future};

use chrono::Utc;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  achievement::{AchievementContent, AchievementType, Attachment, Details, NewContent},
  directory::{Caller, Role, Student},
  reference::{AchievementReference, AchievementStatus, NewReference},
  saga::{Compensation, Operation, Saga, Step},
  sanitize::clean_details,
  store::{
    Backend, ContentStore, FileSink, ReferenceQuery, ReferenceStore, StudentDirectory, Upload,
  },
  view::{
    AchievementDetail, AchievementSummary, CreatedAchievement, HistoryEvent, Reconciliation,
    history,
  },
  workflow::{Action, Authority, transition},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Per-request context: who is calling and by when the work must finish.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
  pub caller:   Caller,
  /// Applied to every store call. `None` means no deadline.
  pub deadline: Option<Instant>,
}

impl RequestContext {
  pub fn new(caller: Caller) -> Self { Self { caller, deadline: None } }

  pub fn with_deadline(mut self, deadline: Instant) -> Self {
    self.deadline = Some(deadline);
    self
  }
}

/// Body of create and update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AchievementInput {
  pub achievement_type: String,
  pub title:            String,
  #[serde(default)]
  pub description:      String,
  #[serde(default)]
  pub tags:             Vec<String>,
  #[serde(default)]
  pub details:          Details,
}

impl AchievementInput {
  fn validate(&self) -> Result<()> {
    let mut missing = Vec::new();
    if self.achievement_type.trim().is_empty() {
      missing.push("achievement_type");
    }
    if self.title.trim().is_empty() {
      missing.push("title");
    }
    if missing.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(format!("missing required fields: {}", missing.join(", "))))
    }
  }
}

/// Run one store call under the request deadline, boxing its error.
async fn call<T, E, F>(deadline: Option<Instant>, fut: F) -> Result<T>
where
  F: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  let res = match deadline {
    Some(at) => tokio::time::timeout_at(at, fut)
      .await
      .map_err(|_| Error::DeadlineExceeded)?,
    None => fut.await,
  };
  res.map_err(Error::store)
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Owns the achievement state machine over a [`Backend`].
pub struct AchievementService<B> {
  backend: B,
}

impl<B: Backend> AchievementService<B> {
  pub fn new(backend: B) -> Self { Self { backend } }

  pub fn backend(&self) -> &B { &self.backend }

  // ── Create ──────────────────────────────────────────────────────────────

  /// Create a draft achievement owned by the calling student.
  pub async fn create(
    &self,
    ctx: &RequestContext,
    input: AchievementInput,
  ) -> Result<CreatedAchievement> {
    input.validate()?;
    let student = self
      .caller_student(ctx)
      .await?
      .ok_or_else(|| Error::NotFound("student profile".into()))?;

    let achievement_type = AchievementType::parse(input.achievement_type.trim());
    let details = clean_details(&achievement_type, &input.details);
    let new_content = NewContent {
      student_code: student.student_code.clone(),
      achievement_type,
      title: input.title,
      description: input.description,
      details,
      tags: input.tags.into_iter().collect(),
    };

    let mut saga = Saga::new(Operation::Create);

    let content = call(ctx.deadline, self.backend.content().insert(new_content)).await?;
    saga.record(Step::ContentWritten { content_id: content.id });

    let new_reference = NewReference { student_id: student.id, content_id: content.id };
    let reference = match call(ctx.deadline, self.backend.references().insert(new_reference)).await
    {
      Ok(r) => r,
      Err(e @ Error::Store(_)) => {
        error!(content_id = %content.id, error = %e, "reference insert failed after content insert");
        self.compensate(&saga).await;
        return Err(e);
      }
      // Outcome of the abandoned insert is unknown; nothing is compensated.
      Err(e) => return Err(e),
    };
    saga.record(Step::ReferenceWritten { reference_id: reference.id });

    info!(content_id = %content.id, reference_id = %reference.id, "achievement created");
    Ok(CreatedAchievement {
      id:           content.id,
      reference_id: reference.id,
      status:       reference.status,
    })
  }

  // ── Update ──────────────────────────────────────────────────────────────

  /// Overwrite the content of a draft owned by the caller.
  pub async fn update(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
    input: AchievementInput,
  ) -> Result<AchievementContent> {
    input.validate()?;
    let reference = self.guarded(ctx, content_id, Action::Update).await?;

    let mut content = call(ctx.deadline, self.backend.content().get(content_id, false))
      .await?
      .ok_or_else(|| Error::NotFound(format!("achievement {content_id}")))?;

    let achievement_type = AchievementType::parse(input.achievement_type.trim());
    content.details = clean_details(&achievement_type, &input.details);
    content.achievement_type = achievement_type;
    content.title = input.title;
    content.description = input.description;
    content.tags = input.tags.into_iter().collect();
    content.updated_at = Utc::now();

    // Reference first: a version conflict then leaves both halves untouched.
    let mut saga = Saga::new(Operation::Update);
    let mut touched = reference;
    touched.updated_at = content.updated_at;
    let stamped = self.commit(ctx, touched).await?;
    saga.record(Step::ReferenceWritten { reference_id: stamped.id });

    if let Err(e) = call(ctx.deadline, self.backend.content().replace(content.clone())).await {
      warn!(%content_id, error = %e, "reference stamped but content replace failed");
      self.compensate(&saga).await;
      return Err(e);
    }
    saga.record(Step::ContentWritten { content_id });

    info!(%content_id, "draft updated");
    Ok(content)
  }

  // ── Transitions ─────────────────────────────────────────────────────────

  /// draft → submitted, by the owner.
  pub async fn submit(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
  ) -> Result<AchievementReference> {
    let mut reference = self.guarded(ctx, content_id, Action::Submit).await?;
    let now = Utc::now();
    reference.status = Action::Submit.target();
    reference.submitted_at = Some(now);
    reference.updated_at = now;
    self.finish(ctx, reference, Action::Submit).await
  }

  /// submitted → verified, by an advisor or admin.
  pub async fn verify(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
  ) -> Result<AchievementReference> {
    let mut reference = self.guarded(ctx, content_id, Action::Verify).await?;
    let now = Utc::now();
    reference.status = Action::Verify.target();
    reference.verified_at = Some(now);
    reference.verified_by = Some(ctx.caller.user_id);
    reference.updated_at = now;
    self.finish(ctx, reference, Action::Verify).await
  }

  /// submitted → rejected, by an advisor or admin, with a note.
  pub async fn reject(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
    note: String,
  ) -> Result<AchievementReference> {
    let note = note.trim().to_owned();
    if note.is_empty() {
      return Err(Error::Validation("a rejection note is required".into()));
    }
    let mut reference = self.guarded(ctx, content_id, Action::Reject).await?;
    let now = Utc::now();
    reference.status = Action::Reject.target();
    reference.verified_at = Some(now);
    reference.verified_by = Some(ctx.caller.user_id);
    reference.rejection_note = Some(note);
    reference.updated_at = now;
    self.finish(ctx, reference, Action::Reject).await
  }

  /// draft → deleted, by the owner. The content is soft-deleted first; if that
  /// fails the reference is left untouched, and if the reference write then
  /// fails the content is restored.
  pub async fn delete(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
  ) -> Result<AchievementReference> {
    let mut reference = self.guarded(ctx, content_id, Action::Delete).await?;

    let mut saga = Saga::new(Operation::Delete);
    call(ctx.deadline, self.backend.content().soft_delete(reference.content_id)).await?;
    saga.record(Step::ContentWritten { content_id });

    reference.status = Action::Delete.target();
    reference.updated_at = Utc::now();
    match self.finish(ctx, reference, Action::Delete).await {
      Ok(r) => Ok(r),
      Err(e @ (Error::Conflict(_) | Error::Store(_))) => {
        error!(%content_id, error = %e, "content soft-deleted but reference not updated");
        self.compensate(&saga).await;
        Err(e)
      }
      // Outcome of the abandoned update is unknown; nothing is compensated.
      Err(e) => Err(e),
    }
  }

  // ── Attachments ─────────────────────────────────────────────────────────

  /// Store `uploads` and append their descriptors to the content.
  pub async fn attach(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
    uploads: Vec<Upload>,
  ) -> Result<Vec<Attachment>> {
    let mut content = call(ctx.deadline, self.backend.content().get(content_id, false))
      .await?
      .ok_or_else(|| Error::NotFound(format!("achievement {content_id}")))?;

    if uploads.is_empty() {
      return Err(Error::Validation("no files uploaded".into()));
    }

    let mut added = Vec::with_capacity(uploads.len());
    for upload in uploads {
      let file_name = upload.file_name.clone();
      let file_type = upload.content_type.clone();
      let file_url = call(
        ctx.deadline,
        self.backend.files().store(content.student_code.clone(), upload),
      )
      .await?;
      added.push(Attachment { file_name, file_url, file_type, uploaded_at: Utc::now() });
    }

    content.attachments.extend(added.iter().cloned());
    content.updated_at = Utc::now();
    call(ctx.deadline, self.backend.content().replace(content)).await?;

    info!(%content_id, count = added.len(), "attachments appended");
    Ok(added)
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  /// Achievements visible to the caller, newest content first.
  pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<AchievementSummary>> {
    let query = match ctx.caller.role {
      Role::Student => {
        let student = self
          .caller_student(ctx)
          .await?
          .ok_or_else(|| Error::NotFound("student profile".into()))?;
        ReferenceQuery { student_ids: Some(vec![student.id]), ..Default::default() }
      }
      Role::Advisor => {
        let advisees =
          call(ctx.deadline, self.backend.directory().advisee_ids(ctx.caller.user_id)).await?;
        ReferenceQuery {
          student_ids: Some(advisees),
          statuses: vec![AchievementStatus::Submitted],
          ..Default::default()
        }
      }
      Role::Admin => ReferenceQuery { exclude_deleted: true, ..Default::default() },
    };

    let references = call(ctx.deadline, self.backend.references().list(query)).await?;

    let mut students: HashMap<Uuid, Option<Student>> = HashMap::new();
    let mut items = Vec::with_capacity(references.len());
    for reference in references {
      let content = match call(ctx.deadline, self.backend.content().get(reference.content_id, false))
        .await
      {
        Ok(Some(c)) => c,
        Ok(None) => continue,
        Err(Error::DeadlineExceeded) => return Err(Error::DeadlineExceeded),
        Err(e) => {
          warn!(content_id = %reference.content_id, error = %e, "skipping unreadable content");
          continue;
        }
      };

      if !students.contains_key(&reference.student_id) {
        let student = call(
          ctx.deadline,
          self.backend.directory().student_by_id(reference.student_id),
        )
        .await?;
        students.insert(reference.student_id, student);
      }
      let student = students.get(&reference.student_id).and_then(Option::as_ref);

      items.push(AchievementSummary::assemble(&reference, &content, student));
    }

    items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(items)
  }

  /// One achievement with its promoted detail fields.
  pub async fn detail(&self, ctx: &RequestContext, content_id: Uuid) -> Result<AchievementDetail> {
    let reference = self.load_reference(ctx, content_id).await?;
    self.authorize_read(ctx, &reference).await?;

    let include_deleted = ctx.caller.role == Role::Admin;
    let content = call(
      ctx.deadline,
      self.backend.content().get(reference.content_id, include_deleted),
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("achievement {content_id}")))?;

    Ok(AchievementDetail::assemble(&reference, content))
  }

  /// Status history projected from the reference timestamps.
  pub async fn history(&self, ctx: &RequestContext, content_id: Uuid) -> Result<Vec<HistoryEvent>> {
    let reference = self.load_reference(ctx, content_id).await?;
    self.authorize_read(ctx, &reference).await?;
    Ok(history(&reference))
  }

  // ── Reconciliation (admin) ──────────────────────────────────────────────

  /// Both halves of `content_id` as stored, for manual repair.
  pub async fn inspect(&self, ctx: &RequestContext, content_id: Uuid) -> Result<Reconciliation> {
    Self::require_admin(ctx)?;
    let content = call(ctx.deadline, self.backend.content().get(content_id, true)).await?;
    let reference = call(ctx.deadline, self.backend.references().by_content_id(content_id)).await?;
    Ok(Reconciliation { content_id, content, reference })
  }

  /// Live content documents that no reference points at.
  pub async fn orphans(&self, ctx: &RequestContext) -> Result<Vec<AchievementContent>> {
    Self::require_admin(ctx)?;
    let ids = call(ctx.deadline, self.backend.content().live_ids()).await?;

    let mut orphans = Vec::new();
    for id in ids {
      if call(ctx.deadline, self.backend.references().by_content_id(id)).await?.is_some() {
        continue;
      }
      if let Some(content) = call(ctx.deadline, self.backend.content().get(id, false)).await? {
        orphans.push(content);
      }
    }
    Ok(orphans)
  }

  // ── Guards ──────────────────────────────────────────────────────────────

  async fn caller_student(&self, ctx: &RequestContext) -> Result<Option<Student>> {
    call(ctx.deadline, self.backend.directory().student_by_user(ctx.caller.user_id)).await
  }

  async fn load_reference(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
  ) -> Result<AchievementReference> {
    call(ctx.deadline, self.backend.references().by_content_id(content_id))
      .await?
      .ok_or_else(|| Error::NotFound(format!("achievement {content_id}")))
  }

  /// Load the reference and apply the authority then state guard for
  /// `action`. Nothing is written.
  async fn guarded(
    &self,
    ctx: &RequestContext,
    content_id: Uuid,
    action: Action,
  ) -> Result<AchievementReference> {
    let reference = self.load_reference(ctx, content_id).await?;

    match action.authority() {
      Authority::Owner => {
        let owns = self
          .caller_student(ctx)
          .await?
          .is_some_and(|s| s.id == reference.student_id);
        if !owns {
          warn!(%content_id, user_id = %ctx.caller.user_id, %action, "caller does not own achievement");
          return Err(Error::Forbidden(format!("only the owner may {action} this achievement")));
        }
      }
      Authority::Reviewer => {
        if !ctx.caller.role.can_review() {
          warn!(%content_id, user_id = %ctx.caller.user_id, %action, "caller is not a reviewer");
          return Err(Error::Forbidden(format!("only advisors and admins may {action}")));
        }
        if ctx.caller.role == Role::Advisor && !self.advises(ctx, reference.student_id).await? {
          warn!(%content_id, user_id = %ctx.caller.user_id, %action, "advisor does not advise owner");
          return Err(Error::Forbidden(format!("only the student's advisor may {action}")));
        }
      }
    }

    if let Err(e) = transition(reference.status, action) {
      warn!(%content_id, status = %reference.status, %action, "transition refused");
      return Err(e);
    }
    Ok(reference)
  }

  async fn authorize_read(&self, ctx: &RequestContext, reference: &AchievementReference) -> Result<()> {
    let allowed = match ctx.caller.role {
      Role::Admin => true,
      Role::Student => self
        .caller_student(ctx)
        .await?
        .is_some_and(|s| s.id == reference.student_id),
      Role::Advisor => self.advises(ctx, reference.student_id).await?,
    };
    if allowed {
      Ok(())
    } else {
      Err(Error::Forbidden("achievement belongs to another student".into()))
    }
  }

  /// Whether the calling lecturer is the academic advisor of `student_id`.
  async fn advises(&self, ctx: &RequestContext, student_id: Uuid) -> Result<bool> {
    let advisees =
      call(ctx.deadline, self.backend.directory().advisee_ids(ctx.caller.user_id)).await?;
    Ok(advisees.contains(&student_id))
  }

  fn require_admin(ctx: &RequestContext) -> Result<()> {
    if ctx.caller.role == Role::Admin {
      Ok(())
    } else {
      Err(Error::Forbidden("admin only".into()))
    }
  }

  // ── Writes ──────────────────────────────────────────────────────────────

  /// Compare-and-swap the reference row.
  async fn commit(
    &self,
    ctx: &RequestContext,
    reference: AchievementReference,
  ) -> Result<AchievementReference> {
    let content_id = reference.content_id;
    call(ctx.deadline, self.backend.references().update(reference))
      .await?
      .ok_or(Error::Conflict(content_id))
  }

  async fn finish(
    &self,
    ctx: &RequestContext,
    reference: AchievementReference,
    action: Action,
  ) -> Result<AchievementReference> {
    let stored = self.commit(ctx, reference).await?;
    info!(content_id = %stored.content_id, status = %stored.status, %action, "achievement transitioned");
    Ok(stored)
  }

  /// Run the rollback actions owed by `saga`. Failures are logged and
  /// swallowed; the caller reports the primary error.
  async fn compensate(&self, saga: &Saga) {
    for compensation in saga.compensations() {
      match compensation {
        Compensation::SoftDeleteContent { content_id } => {
          match self.backend.content().soft_delete(content_id).await {
            Ok(()) => info!(%content_id, "compensated: content soft-deleted"),
            Err(e) => error!(%content_id, error = %e, "compensation failed; orphan content left"),
          }
        }
        Compensation::RestoreContent { content_id } => {
          match self.backend.content().restore(content_id).await {
            Ok(()) => info!(%content_id, "compensated: content restored"),
            Err(e) => {
              error!(%content_id, error = %e, "compensation failed; live reference points at deleted content")
            }
          }
        }
      }
    }
  }
}
