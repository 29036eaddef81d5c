//! Step log and compensation table for operations spanning both stores.
//!
//! Every cross-store operation records a [`Step`] as soon as a store call
//! commits. When a later step fails, [`Saga::compensations`] looks up the
//! rollback actions owed for what already committed. The table is the single
//! place where the accepted inconsistency windows are written down.

use uuid::Uuid;

/// A cross-store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Create,
  Update,
  Delete,
}

/// A store write that has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// Content document inserted, replaced or soft-deleted.
  ContentWritten { content_id: Uuid },
  /// Reference row inserted or updated.
  ReferenceWritten { reference_id: Uuid },
}

/// A rollback action owed after a partial failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
  SoftDeleteContent { content_id: Uuid },
  /// Undo a soft delete whose reference half was never written.
  RestoreContent { content_id: Uuid },
}

/// Rollback actions owed when `operation` fails after `committed`.
///
/// | Operation | Committed            | Owed                    |
/// |-----------|----------------------|-------------------------|
/// | Create    | content only         | soft-delete the content |
/// | Create    | content + reference  | nothing                 |
/// | Update    | reference only       | nothing (stamp ahead of content) |
/// | Delete    | content only         | restore the content     |
/// | Delete    | content + reference  | nothing                 |
/// | any       | nothing              | nothing                 |
///
/// Update writes the reference first, so a version conflict leaves both
/// halves untouched. A concurrent transition landing between that write and
/// the content replace is not covered.
pub fn compensation_table(operation: Operation, committed: &[Step]) -> Vec<Compensation> {
  let reference_written = committed
    .iter()
    .any(|s| matches!(s, Step::ReferenceWritten { .. }));

  match operation {
    Operation::Create if !reference_written => committed
      .iter()
      .filter_map(|s| match *s {
        Step::ContentWritten { content_id } => {
          Some(Compensation::SoftDeleteContent { content_id })
        }
        Step::ReferenceWritten { .. } => None,
      })
      .collect(),
    Operation::Delete if !reference_written => committed
      .iter()
      .filter_map(|s| match *s {
        Step::ContentWritten { content_id } => Some(Compensation::RestoreContent { content_id }),
        Step::ReferenceWritten { .. } => None,
      })
      .collect(),
    Operation::Create | Operation::Update | Operation::Delete => Vec::new(),
  }
}

/// The step log of one in-flight operation.
#[derive(Debug, Clone)]
pub struct Saga {
  operation: Operation,
  steps:     Vec<Step>,
}

impl Saga {
  pub fn new(operation: Operation) -> Self { Self { operation, steps: Vec::new() } }

  pub fn operation(&self) -> Operation { self.operation }

  pub fn record(&mut self, step: Step) { self.steps.push(step); }

  pub fn steps(&self) -> &[Step] { &self.steps }

  /// Rollback actions owed if the next step fails.
  pub fn compensations(&self) -> Vec<Compensation> {
    compensation_table(self.operation, &self.steps)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn content() -> Step { Step::ContentWritten { content_id: Uuid::nil() } }

  fn reference() -> Step {
    Step::ReferenceWritten { reference_id: Uuid::from_u128(1) }
  }

  #[test]
  fn create_after_content_owes_one_soft_delete() {
    let mut saga = Saga::new(Operation::Create);
    saga.record(content());
    assert_eq!(
      saga.compensations(),
      vec![Compensation::SoftDeleteContent { content_id: Uuid::nil() }]
    );
  }

  #[test]
  fn completed_create_owes_nothing() {
    assert!(compensation_table(Operation::Create, &[content(), reference()]).is_empty());
  }

  #[test]
  fn nothing_committed_owes_nothing() {
    for op in [Operation::Create, Operation::Update, Operation::Delete] {
      assert!(compensation_table(op, &[]).is_empty());
    }
  }

  #[test]
  fn update_has_no_compensation() {
    assert!(compensation_table(Operation::Update, &[reference()]).is_empty());
    assert!(compensation_table(Operation::Update, &[reference(), content()]).is_empty());
  }

  #[test]
  fn delete_after_content_owes_restore() {
    assert_eq!(
      compensation_table(Operation::Delete, &[content()]),
      vec![Compensation::RestoreContent { content_id: Uuid::nil() }]
    );
    assert!(compensation_table(Operation::Delete, &[content(), reference()]).is_empty());
  }
}
