//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;

use regional_core::{
  apply::apply,
  plan::plan,
  regional::{ExternalRegional, MAX_NAME_LEN},
  store::{RegionalStore, RegionalTx},
  summary::ApplyCounts,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ext(id: i64, name: &str) -> ExternalRegional { ExternalRegional::new(id, name) }

/// Plan and apply `snapshot` in one transaction, the way the reconciler does.
async fn reconcile(
  s: &SqliteStore,
  snapshot: Vec<ExternalRegional>,
) -> Result<ApplyCounts, Error> {
  s.run_in_transaction(move |tx| {
    let active = tx.list_active()?;
    apply(tx, &plan(&snapshot, &active))
  })
  .await
}

// ─── Transactions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_list_active() {
  let s = store().await;

  let inserted = s
    .run_in_transaction(|tx| {
      let b = tx.insert_active(2, "Norte")?;
      let a = tx.insert_active(1, "Sul")?;
      Ok((a, b))
    })
    .await
    .unwrap();
  assert!(inserted.0.active);
  assert_eq!(inserted.0.created_at, inserted.0.updated_at);

  let active = s.list_active().await.unwrap();
  assert_eq!(active.len(), 2);
  // Ordered by external_id, not by insertion.
  assert_eq!(active[0].external_id, 1);
  assert_eq!(active[1].external_id, 2);
  assert_eq!(active[0], inserted.0);
}

#[tokio::test]
async fn failed_closure_rolls_back() {
  let s = store().await;

  let result = s
    .run_in_transaction(|tx| {
      tx.insert_active(1, "Sul")?;
      tx.insert_active(2, &"x".repeat(MAX_NAME_LEN + 1))?;
      Ok(())
    })
    .await;

  assert!(matches!(
    result,
    Err(Error::Core(regional_core::Error::NameTooLong(2)))
  ));
  assert!(s.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn inactivate_twice_is_rejected() {
  let s = store().await;
  let row = s
    .run_in_transaction(|tx| tx.insert_active(1, "Sul"))
    .await
    .unwrap();
  let row_id = row.id;

  s.run_in_transaction(move |tx| tx.inactivate(row_id))
    .await
    .unwrap();
  let again = s.run_in_transaction(move |tx| tx.inactivate(row_id)).await;
  assert!(matches!(
    again,
    Err(Error::Core(regional_core::Error::NotActive(id))) if id == row_id
  ));

  let all = s.list_all().await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(!all[0].active);
  assert!(all[0].updated_at >= all[0].created_at);
}

#[tokio::test]
async fn second_active_row_for_same_key_is_refused() {
  let s = store().await;
  let result = s
    .run_in_transaction(|tx| {
      tx.insert_active(1, "Sul")?;
      tx.insert_active(1, "Sul - Novo")?;
      Ok(())
    })
    .await;

  assert!(matches!(result, Err(Error::Core(regional_core::Error::Storage(_)))));
  assert!(s.list_all().await.unwrap().is_empty());
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_active_ignores_inactive_versions() {
  let s = store().await;
  reconcile(&s, vec![ext(1, "Sul")]).await.unwrap();
  reconcile(&s, vec![ext(1, "Sul - Novo")]).await.unwrap();

  let found = s.find_active(1).await.unwrap().unwrap();
  assert_eq!(found.name, "Sul - Novo");
  assert!(s.find_active(99).await.unwrap().is_none());
}

#[tokio::test]
async fn list_all_is_ordered_by_id() {
  let s = store().await;
  reconcile(&s, vec![ext(3, "C"), ext(1, "A")]).await.unwrap();
  reconcile(&s, vec![ext(2, "B")]).await.unwrap();

  let ids: Vec<i64> = s.list_all().await.unwrap().iter().map(|r| r.id).collect();
  let mut sorted = ids.clone();
  sorted.sort();
  assert_eq!(ids, sorted);
  assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn ping_succeeds() {
  store().await.ping().await.unwrap();
}

#[tokio::test]
async fn data_survives_reopen() {
  let dir = std::env::temp_dir().join(format!(
    "regional-store-test-{}-{}",
    std::process::id(),
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
  ));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("regionais.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    reconcile(&s, vec![ext(1, "Sul")]).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.list_active().await.unwrap().len(), 1);

  std::fs::remove_dir_all(&dir).ok();
}

// ─── Reconciliation end to end ───────────────────────────────────────────────

#[tokio::test]
async fn rename_creates_new_version_with_later_created_at() {
  let s = store().await;
  reconcile(&s, vec![ext(1, "Sul")]).await.unwrap();

  let counts = reconcile(&s, vec![ext(1, "Sul - Novo")]).await.unwrap();
  assert_eq!(counts, ApplyCounts { inserted: 0, inactivated: 0, updated: 1 });

  let all = s.list_all().await.unwrap();
  assert_eq!(all.len(), 2);
  let (old, new) = (&all[0], &all[1]);
  assert_eq!((old.name.as_str(), old.active), ("Sul", false));
  assert_eq!((new.name.as_str(), new.active), ("Sul - Novo", true));
  assert!(new.created_at >= old.created_at);
}

#[tokio::test]
async fn repeated_snapshot_leaves_table_identical() {
  let s = store().await;
  let snapshot = vec![ext(1, "Sul"), ext(2, "Norte"), ext(3, "Leste")];
  reconcile(&s, vec![ext(1, "Sul"), ext(4, "Oeste")]).await.unwrap();
  reconcile(&s, snapshot.clone()).await.unwrap();
  let before = s.list_all().await.unwrap();

  let counts = reconcile(&s, snapshot).await.unwrap();
  assert!(counts.is_noop());
  assert_eq!(s.list_all().await.unwrap(), before);
}

#[tokio::test]
async fn sequence_of_snapshots_keeps_invariants() {
  let s = store().await;
  let snapshots = vec![
    vec![ext(1, "Sul"), ext(2, "Norte")],
    vec![ext(1, "Sul"), ext(2, "Norte - v2"), ext(3, "Leste")],
    vec![ext(3, "Leste")],
    vec![ext(1, "Sul"), ext(3, "Leste - v2")],
    vec![ext(2, "Norte - v2"), ext(3, "Leste - v2")],
  ];

  let mut previous_rows = 0;
  for snapshot in snapshots {
    reconcile(&s, snapshot.clone()).await.unwrap();
    let all = s.list_all().await.unwrap();

    // No row is ever deleted.
    assert!(all.len() >= previous_rows);
    previous_rows = all.len();

    // At most one active row per key.
    let mut active_per_key: BTreeMap<i64, usize> = BTreeMap::new();
    for r in all.iter().filter(|r| r.active) {
      *active_per_key.entry(r.external_id).or_default() += 1;
    }
    assert!(active_per_key.values().all(|&n| n == 1));

    // Active set mirrors the snapshot exactly.
    let active: Vec<(i64, String)> = s
      .list_active()
      .await
      .unwrap()
      .into_iter()
      .map(|r| (r.external_id, r.name))
      .collect();
    let mut expected: Vec<(i64, String)> =
      snapshot.into_iter().map(|r| (r.external_id, r.name)).collect();
    expected.sort();
    assert_eq!(active, expected);
  }
}
