//! The `UniquenessLedger` trait.
//!
//! Implemented by storage backends (e.g. `tally-store-sqlite`). Higher layers
//! (`tally-api`) depend on this abstraction, not on any concrete backend.
//!
//! The durable store behind an implementation is the single source of truth:
//! `check_conflicts` is advisory only, and `commit` must enforce the
//! exclusivity invariants itself, atomically, under any caller interleaving.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::{
  claim::{Claim, ClaimIntent, Conflict},
  operation::{CloseOutcome, NewOperation, Operation, OperationState},
};

/// Why a commit failed. The two cases demand different caller behaviour:
/// a conflict is final for the offending values, while a storage failure is
/// safe to retry wholesale because partial application is disallowed.
#[derive(Debug, Error)]
pub enum CommitError<E>
where
  E: std::error::Error,
{
  /// The commit lost its uniqueness race; carries every offending
  /// `(class, value)` pair. The losing commit left no trace in the store.
  #[error("uniqueness conflict on {} claim(s)", .0.len())]
  Conflict(Vec<Conflict>),

  /// The transaction could not be attempted or durably committed.
  #[error(transparent)]
  Storage(E),
}

impl<E: std::error::Error> CommitError<E> {
  /// The structured conflict list, when this is a conflict failure.
  pub fn conflicts(&self) -> Option<&[Conflict]> {
    match self {
      Self::Conflict(c) => Some(c),
      Self::Storage(_) => None,
    }
  }
}

/// Abstraction over a Tally ledger backend.
///
/// Claims are created only by `commit`, as one atomic unit with their
/// operation row, and are never deleted; the only mutation is the release of
/// renewable claims on closure.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait UniquenessLedger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Claims ────────────────────────────────────────────────────────────

  /// Advisory conflict scan for a set of intended claims.
  ///
  /// A permanent intent conflicts with any persisted row for its
  /// `(class, value)` pair, regardless of active state; a renewable intent
  /// conflicts only with an `active = true` row. Conflicts are returned as
  /// data, never as an error — this call reduces races but does not replace
  /// the atomic guarantee of [`commit`](Self::commit).
  fn check_conflicts<'a>(
    &'a self,
    intents: &'a [ClaimIntent],
  ) -> impl Future<Output = Result<Vec<Conflict>, Self::Error>> + Send + 'a;

  /// Persist a new operation and all its claims as one atomic unit.
  ///
  /// Either every claim and the operation row are durably recorded and
  /// visible to all subsequent callers, or none are. When a claim loses a
  /// race for its uniqueness scope, the whole commit fails with
  /// [`CommitError::Conflict`] naming every offending `(class, value)` pair
  /// and leaves no partial trace.
  fn commit(
    &self,
    draft: NewOperation,
    intents: Vec<ClaimIntent>,
  ) -> impl Future<Output = Result<Operation, CommitError<Self::Error>>> + Send + '_;

  /// Release every active renewable claim owned by `operation_id`, in one
  /// transaction. Idempotent; permanent claims are untouched. Returns the
  /// number of claims released by this call, or `None` for an unknown
  /// operation.
  fn release(
    &self,
    operation_id: Uuid,
  ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + '_;

  // ── Operations ────────────────────────────────────────────────────────

  /// Transition an operation `Open → Closed` and release its renewable
  /// claims, atomically. Closing an already closed operation is a successful
  /// no-op reporting `already_closed`. Returns `None` for an unknown
  /// operation.
  fn close(
    &self,
    operation_id: Uuid,
  ) -> impl Future<Output = Result<Option<CloseOutcome>, Self::Error>> + Send + '_;

  /// Retrieve an operation by id. Returns `None` if not found.
  fn get_operation(
    &self,
    operation_id: Uuid,
  ) -> impl Future<Output = Result<Option<Operation>, Self::Error>> + Send + '_;

  /// List operations, optionally filtered by state.
  fn list_operations(
    &self,
    state: Option<OperationState>,
  ) -> impl Future<Output = Result<Vec<Operation>, Self::Error>> + Send + '_;

  /// All claims owned by an operation, released ones included.
  fn claims_for(
    &self,
    operation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Claim>, Self::Error>> + Send + '_;
}
