//! Applier: runs a [`Plan`] through a transaction handle.
//!
//! The applier does not commit or roll back itself. It is meant to be called
//! from inside [`RegionalStore::run_in_transaction`], which commits when it
//! returns `Ok` and discards every step otherwise.
//!
//! [`RegionalStore::run_in_transaction`]: crate::store::RegionalStore::run_in_transaction

use crate::{
  Result,
  plan::{Plan, Step},
  store::RegionalTx,
  summary::ApplyCounts,
};

/// Execute `plan` in step order, tallying what was done.
///
/// A replace counts once, as `updated`, not as one inactivation plus one
/// insert.
pub fn apply(tx: &mut dyn RegionalTx, plan: &Plan) -> Result<ApplyCounts> {
  let mut counts = ApplyCounts::default();

  for step in plan.steps() {
    match step {
      Step::Inactivate { local_id, external_id, replaced } => {
        tx.inactivate(local_id)?;
        if replaced {
          tracing::debug!(local_id, external_id, "inactivated version being replaced");
        } else {
          tracing::debug!(local_id, external_id, "inactivated regional gone upstream");
          counts.inactivated += 1;
        }
      }
      Step::Insert { external_id, name, replacement } => {
        let record = tx.insert_active(external_id, name)?;
        if replacement {
          tracing::debug!(local_id = record.id, external_id, name, "inserted new version");
          counts.updated += 1;
        } else {
          tracing::debug!(local_id = record.id, external_id, name, "inserted regional");
          counts.inserted += 1;
        }
      }
    }
  }

  Ok(counts)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::collections::{BTreeMap, BTreeSet};

  use chrono::Utc;
  use proptest::prelude::*;

  use super::*;
  use crate::{
    Error,
    plan::plan,
    regional::{ExternalRegional, RegionalRecord, dedupe_snapshot, name_fits},
  };

  /// A plain in-memory table with the same contract as the SQLite backend.
  #[derive(Debug, Clone, Default)]
  struct MemoryTx {
    rows: Vec<RegionalRecord>,
  }

  impl RegionalTx for MemoryTx {
    fn list_active(&mut self) -> Result<Vec<RegionalRecord>> {
      let mut active: Vec<_> =
        self.rows.iter().filter(|r| r.active).cloned().collect();
      active.sort_by_key(|r| r.external_id);
      Ok(active)
    }

    fn insert_active(
      &mut self,
      external_id: i64,
      name: &str,
    ) -> Result<RegionalRecord> {
      if !name_fits(name) {
        return Err(Error::NameTooLong(external_id));
      }
      let now = Utc::now();
      let record = RegionalRecord {
        id: self.rows.len() as i64 + 1,
        external_id,
        name: name.to_owned(),
        active: true,
        created_at: now,
        updated_at: now,
      };
      self.rows.push(record.clone());
      Ok(record)
    }

    fn inactivate(&mut self, id: i64) -> Result<()> {
      let row = self
        .rows
        .iter_mut()
        .find(|r| r.id == id && r.active)
        .ok_or(Error::NotActive(id))?;
      row.active = false;
      row.updated_at = Utc::now();
      Ok(())
    }
  }

  impl MemoryTx {
    /// One reconciliation: plan against the current active set, then apply.
    /// Mirrors the store's rollback by only keeping the mutated copy on
    /// success.
    fn reconcile(&mut self, snapshot: &[ExternalRegional]) -> Result<ApplyCounts> {
      let mut staged = self.clone();
      let active = staged.list_active()?;
      let counts = apply(&mut staged, &plan(snapshot, &active))?;
      *self = staged;
      Ok(counts)
    }

    fn active_pairs(&self) -> BTreeSet<(i64, String)> {
      self
        .rows
        .iter()
        .filter(|r| r.active)
        .map(|r| (r.external_id, r.name.clone()))
        .collect()
    }

    fn max_active_per_key(&self) -> usize {
      let mut per_key: BTreeMap<i64, usize> = BTreeMap::new();
      for r in self.rows.iter().filter(|r| r.active) {
        *per_key.entry(r.external_id).or_default() += 1;
      }
      per_key.values().copied().max().unwrap_or(0)
    }
  }

  fn ext(id: i64, name: &str) -> ExternalRegional { ExternalRegional::new(id, name) }

  // ── Literal scenarios ──────────────────────────────────────────────────────

  #[test]
  fn fresh_insert() {
    let mut t = MemoryTx::default();
    let counts = t.reconcile(&[ext(1, "Sul"), ext(2, "Norte")]).unwrap();
    assert_eq!(counts, ApplyCounts { inserted: 2, inactivated: 0, updated: 0 });
    assert_eq!(t.rows.len(), 2);
  }

  #[test]
  fn disappearance_inactivates() {
    let mut t = MemoryTx::default();
    t.reconcile(&[ext(1, "Sul"), ext(2, "Norte")]).unwrap();

    let counts = t.reconcile(&[ext(1, "Sul")]).unwrap();
    assert_eq!(counts, ApplyCounts { inserted: 0, inactivated: 1, updated: 0 });
    let norte = t.rows.iter().find(|r| r.external_id == 2).unwrap();
    assert!(!norte.active);
  }

  #[test]
  fn rename_by_versioning() {
    let mut t = MemoryTx::default();
    t.reconcile(&[ext(1, "Sul")]).unwrap();

    let counts = t.reconcile(&[ext(1, "Sul - Novo")]).unwrap();
    assert_eq!(counts, ApplyCounts { inserted: 0, inactivated: 0, updated: 1 });
    assert_eq!(t.rows.len(), 2);
    assert!(!t.rows[0].active);
    assert_eq!(t.rows[0].name, "Sul");
    assert!(t.rows[1].active);
    assert_eq!(t.rows[1].name, "Sul - Novo");
  }

  #[test]
  fn reappearing_key_gets_a_fresh_row() {
    let mut t = MemoryTx::default();
    t.reconcile(&[ext(1, "Sul"), ext(2, "Norte")]).unwrap();
    t.reconcile(&[ext(2, "Norte")]).unwrap();
    let counts = t.reconcile(&[ext(1, "Sul"), ext(2, "Norte")]).unwrap();

    assert_eq!(counts.inserted, 1);
    assert_eq!(t.rows.len(), 3);
    assert!(!t.rows[0].active, "inactivated rows are never resurrected");
  }

  #[test]
  fn failing_step_leaves_no_partial_state() {
    let mut t = MemoryTx::default();
    t.reconcile(&[ext(1, "Sul")]).unwrap();

    let too_long = "x".repeat(crate::regional::MAX_NAME_LEN + 1);
    let err = t.reconcile(&[ext(1, "Sul - Novo"), ext(2, &too_long)]);
    assert!(matches!(err, Err(Error::NameTooLong(2))));
    assert_eq!(t.rows.len(), 1);
    assert!(t.rows[0].active);
  }

  #[test]
  fn inactivating_an_inactive_row_fails() {
    let mut t = MemoryTx::default();
    let row = t.insert_active(1, "Sul").unwrap();
    t.inactivate(row.id).unwrap();
    assert!(matches!(t.inactivate(row.id), Err(Error::NotActive(_))));
  }

  #[test]
  fn every_step_is_logged() {
    use std::{
      io,
      sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
      fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
      }

      fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_ansi(false)
      .without_time()
      .with_writer(move || writer.clone())
      .finish();

    let mut t = MemoryTx::default();
    t.reconcile(&[ext(1, "Sul"), ext(2, "Norte")]).unwrap();
    tracing::subscriber::with_default(subscriber, || {
      t.reconcile(&[ext(1, "Sul - Novo"), ext(3, "Leste")]).unwrap();
    });

    let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4, "{out}");
    assert!(lines.iter().all(|l| l.contains("DEBUG")), "{out}");
    assert!(out.contains("inactivated version being replaced local_id=1 external_id=1"), "{out}");
    assert!(out.contains("inactivated regional gone upstream local_id=2 external_id=2"), "{out}");
    assert!(out.contains("inserted new version local_id=3 external_id=1 name=\"Sul - Novo\""), "{out}");
    assert!(out.contains("inserted regional local_id=4 external_id=3 name=\"Leste\""), "{out}");
  }

  // ── Properties ─────────────────────────────────────────────────────────────

  fn snapshot_strategy() -> impl Strategy<Value = Vec<ExternalRegional>> {
    prop::collection::vec(
      (0i64..12, prop::sample::select(vec!["Sul", "Norte", "Leste", "Oeste"])),
      0..10,
    )
    .prop_map(|pairs| {
      pairs
        .into_iter()
        .map(|(id, name)| ExternalRegional::new(id, name))
        .collect()
    })
  }

  fn as_pairs(snapshot: &[ExternalRegional]) -> BTreeSet<(i64, String)> {
    dedupe_snapshot(snapshot.to_vec())
      .into_iter()
      .map(|r| (r.external_id, r.name))
      .collect()
  }

  proptest! {
    #[test]
    fn at_most_one_active_and_source_of_truth(
      snapshots in prop::collection::vec(snapshot_strategy(), 1..6),
    ) {
      let mut t = MemoryTx::default();
      let mut previous_rows = 0;
      for snapshot in &snapshots {
        let snapshot = dedupe_snapshot(snapshot.clone());
        t.reconcile(&snapshot).unwrap();

        prop_assert!(t.max_active_per_key() <= 1);
        prop_assert_eq!(t.active_pairs(), as_pairs(&snapshot));
        prop_assert!(t.rows.len() >= previous_rows);
        previous_rows = t.rows.len();
      }
    }

    #[test]
    fn second_run_is_a_noop(
      first in snapshot_strategy(),
      second in snapshot_strategy(),
    ) {
      let mut t = MemoryTx::default();
      t.reconcile(&dedupe_snapshot(first)).unwrap();
      let second = dedupe_snapshot(second);
      t.reconcile(&second).unwrap();
      let before = t.rows.clone();

      let counts = t.reconcile(&second).unwrap();
      prop_assert!(counts.is_noop());
      prop_assert_eq!(t.rows, before);
    }

    #[test]
    fn disjoint_batches_commute_with_their_union(
      left in snapshot_strategy(),
      right in snapshot_strategy(),
    ) {
      let left = dedupe_snapshot(left);
      let right: Vec<_> = dedupe_snapshot(right)
        .into_iter()
        .filter(|r| !left.iter().any(|l| l.external_id == r.external_id))
        .collect();
      let union: Vec<_> = left.iter().chain(&right).cloned().collect();

      let inserts_of = |s: &[ExternalRegional]| -> BTreeSet<(i64, String)> {
        let mut t = MemoryTx::default();
        t.reconcile(s).unwrap();
        t.active_pairs()
      };
      let batched: BTreeSet<_> =
        inserts_of(&left).union(&inserts_of(&right)).cloned().collect();
      prop_assert_eq!(&batched, &inserts_of(&union));

      let mut sequential = MemoryTx::default();
      sequential.reconcile(&left).unwrap();
      sequential.reconcile(&union).unwrap();
      prop_assert_eq!(sequential.active_pairs(), batched);
    }
  }
}
