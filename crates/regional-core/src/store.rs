//! The `RegionalStore` trait and the transaction handle it lends out.
//!
//! The trait is implemented by storage backends (e.g.
//! `regional-store-sqlite`). The reconciler and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::regional::RegionalRecord;

// ─── Transaction handle ──────────────────────────────────────────────────────

/// Mutations available inside [`RegionalStore::run_in_transaction`].
///
/// Calls are synchronous: the closure runs wherever the backend executes its
/// transaction (for SQLite, the connection's worker thread).
pub trait RegionalTx {
  /// Active rows ordered by `external_id` ascending.
  fn list_active(&mut self) -> crate::Result<Vec<RegionalRecord>>;

  /// Insert a new active row. Both timestamps are set by the store.
  ///
  /// Fails with [`crate::Error::NameTooLong`] if `name` does not fit the
  /// column.
  fn insert_active(
    &mut self,
    external_id: i64,
    name: &str,
  ) -> crate::Result<RegionalRecord>;

  /// Flip an active row to inactive and bump its `updated_at`.
  ///
  /// Fails with [`crate::Error::NotActive`] if the row does not exist or is
  /// already inactive; the enclosing transaction is then rolled back.
  fn inactivate(&mut self, id: i64) -> crate::Result<()>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a regional store backend.
///
/// Rows are never deleted. All mutation goes through
/// [`run_in_transaction`](Self::run_in_transaction), so readers observe
/// either the state before or after a whole reconciliation.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RegionalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Active rows ordered by `external_id` ascending.
  fn list_active(
    &self,
  ) -> impl Future<Output = Result<Vec<RegionalRecord>, Self::Error>> + Send + '_;

  /// Every row, active or not, ordered by `id` ascending.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<RegionalRecord>, Self::Error>> + Send + '_;

  /// The active row for `external_id`, if there is one.
  fn find_active(
    &self,
    external_id: i64,
  ) -> impl Future<Output = Result<Option<RegionalRecord>, Self::Error>> + Send + '_;

  /// Cheap round-trip used by readiness checks.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Run `f` atomically. The transaction commits if `f` returns `Ok` and
  /// rolls back otherwise; no partial mutation is ever visible.
  fn run_in_transaction<T, F>(
    &self,
    f: F,
  ) -> impl Future<Output = Result<T, Self::Error>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn RegionalTx) -> crate::Result<T> + Send + 'static;
}
