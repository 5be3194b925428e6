//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision, so lexicographic order equals chronological order. `active` is
//! stored as `0`/`1`.

use chrono::{DateTime, SecondsFormat, Utc};
use regional_core::regional::RegionalRecord;

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str =
  "id, external_id, name, active, created_at, updated_at";

/// Raw column values from a `regionais` row, before timestamp parsing.
pub struct RawRecord {
  pub id:          i64,
  pub external_id: i64,
  pub name:        String,
  pub active:      bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawRecord {
  /// Read a row selected with [`RECORD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      external_id: row.get(1)?,
      name:        row.get(2)?,
      active:      row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<RegionalRecord> {
    Ok(RegionalRecord {
      id:          self.id,
      external_id: self.external_id,
      name:        self.name,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}
