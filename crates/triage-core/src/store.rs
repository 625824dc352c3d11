//! The `PolicyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `triage-store-sqlite`).
//! The evaluator and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  error::DomainError,
  policy::{NewPolicy, PolicyPatch, SlaPolicy},
};

/// Abstraction over the authoritative, ordered collection of SLA policies.
///
/// Every mutation bumps a store-wide version counter that callers can pass
/// back to [`PolicyStore::reorder`] to detect interleaved writes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PolicyStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All policies in evaluation order: `position` ascending, then creation
  /// sequence, then id. Deleted policies are included only on request.
  fn list(
    &self,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Vec<SlaPolicy>, Self::Error>> + Send + '_;

  /// Retrieve a policy by id, deleted or not. Returns `None` if no row exists.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SlaPolicy>, Self::Error>> + Send + '_;

  /// The current value of the store-wide version counter.
  fn version(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new policy. Without an explicit position it is appended after
  /// all non-deleted policies. Explicit positions are taken as given.
  fn create(
    &self,
    input: NewPolicy,
  ) -> impl Future<Output = Result<SlaPolicy, Self::Error>> + Send + '_;

  /// Apply a partial update. Fails with `PolicyNotFound` if no row exists.
  fn update(
    &self,
    id: Uuid,
    patch: PolicyPatch,
  ) -> impl Future<Output = Result<SlaPolicy, Self::Error>> + Send + '_;

  /// Mark a policy deleted. Siblings keep their positions; call
  /// [`PolicyStore::compact`] to close the gap. Deleting an already-deleted
  /// policy succeeds and returns it unchanged.
  fn soft_delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<SlaPolicy, Self::Error>> + Send + '_;

  /// Assign `position = index` to each id in `ordered_ids`, atomically.
  ///
  /// The ids must name every non-deleted policy exactly once. When
  /// `expected_version` is set and differs from the current version the call
  /// fails with `VersionConflict` and nothing changes.
  fn reorder(
    &self,
    ordered_ids: Vec<Uuid>,
    expected_version: Option<u64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Renumber non-deleted policies to `0..N-1`, keeping their current order.
  /// Returns the compacted list.
  fn compact(
    &self,
  ) -> impl Future<Output = Result<Vec<SlaPolicy>, Self::Error>> + Send + '_;
}
