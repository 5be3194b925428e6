//! [`SqliteStore`] — the SQLite implementation of [`RegionalStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use regional_core::{
  regional::{RegionalRecord, name_fits},
  store::{RegionalStore, RegionalTx},
};

use crate::{
  Result,
  encode::{RECORD_COLUMNS, RawRecord, decode_dt, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A regional store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT {RECORD_COLUMNS} ...` on the connection thread and decode
  /// the rows.
  async fn select_records(&self, sql: String) -> Result<Vec<RegionalRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| Ok(query_raw(conn, &sql, [])?))
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

fn query_raw<P: rusqlite::Params>(
  conn:   &rusqlite::Connection,
  sql:    &str,
  params: P,
) -> rusqlite::Result<Vec<RawRecord>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map(params, RawRecord::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()
}

// ─── Transaction handle ──────────────────────────────────────────────────────

/// [`RegionalTx`] over an open `BEGIN IMMEDIATE` transaction.
struct SqliteTx<'a> {
  tx: &'a rusqlite::Transaction<'a>,
}

impl RegionalTx for SqliteTx<'_> {
  fn list_active(&mut self) -> regional_core::Result<Vec<RegionalRecord>> {
    let sql = format!(
      "SELECT {RECORD_COLUMNS} FROM regionais WHERE active = 1 ORDER BY external_id"
    );
    query_raw(self.tx, &sql, [])
      .map_err(regional_core::Error::storage)?
      .into_iter()
      .map(|raw| raw.into_record().map_err(regional_core::Error::storage))
      .collect()
  }

  fn insert_active(
    &mut self,
    external_id: i64,
    name:        &str,
  ) -> regional_core::Result<RegionalRecord> {
    if !name_fits(name) {
      return Err(regional_core::Error::NameTooLong(external_id));
    }

    // A replacement must never predate the version it replaces, even if the
    // wall clock stepped backwards since.
    let latest: Option<String> = self
      .tx
      .query_row(
        "SELECT MAX(created_at) FROM regionais WHERE external_id = ?1",
        rusqlite::params![external_id],
        |r| r.get(0),
      )
      .map_err(regional_core::Error::storage)?;

    let mut now = Utc::now().trunc_subsecs(6);
    if let Some(latest) = latest {
      let latest = decode_dt(&latest).map_err(regional_core::Error::storage)?;
      now = now.max(latest);
    }
    let at_str = encode_dt(now);

    self
      .tx
      .execute(
        "INSERT INTO regionais (external_id, name, active, created_at, updated_at)
         VALUES (?1, ?2, 1, ?3, ?3)",
        rusqlite::params![external_id, name, at_str],
      )
      .map_err(regional_core::Error::storage)?;

    Ok(RegionalRecord {
      id: self.tx.last_insert_rowid(),
      external_id,
      name: name.to_owned(),
      active: true,
      created_at: now,
      updated_at: now,
    })
  }

  fn inactivate(&mut self, id: i64) -> regional_core::Result<()> {
    let at_str = encode_dt(Utc::now());
    let changed = self
      .tx
      .execute(
        "UPDATE regionais SET active = 0, updated_at = ?2
         WHERE id = ?1 AND active = 1",
        rusqlite::params![id, at_str],
      )
      .map_err(regional_core::Error::storage)?;

    if changed == 0 {
      return Err(regional_core::Error::NotActive(id));
    }
    Ok(())
  }
}

// ─── RegionalStore impl ──────────────────────────────────────────────────────

impl RegionalStore for SqliteStore {
  type Error = crate::Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_active(&self) -> Result<Vec<RegionalRecord>> {
    self
      .select_records(format!(
        "SELECT {RECORD_COLUMNS} FROM regionais WHERE active = 1 ORDER BY external_id"
      ))
      .await
  }

  async fn list_all(&self) -> Result<Vec<RegionalRecord>> {
    self
      .select_records(format!("SELECT {RECORD_COLUMNS} FROM regionais ORDER BY id"))
      .await
  }

  async fn find_active(&self, external_id: i64) -> Result<Option<RegionalRecord>> {
    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM regionais
                 WHERE external_id = ?1 AND active = 1"
              ),
              rusqlite::params![external_id],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn run_in_transaction<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn RegionalTx) -> regional_core::Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&mut SqliteTx { tx: &tx });
        match outcome {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => {
            tx.rollback()?;
            Ok(Err(e))
          }
        }
      })
      .await?;

    Ok(outcome?)
  }
}
