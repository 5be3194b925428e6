//! Regional records — the local, versioned mirror of the upstream dataset.
//!
//! A record's `name` is never edited while it is active. A rename upstream is
//! stored by inactivating the current row and inserting a replacement, so the
//! table keeps every version an `external_id` has ever had.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest `name` the local table accepts, in characters.
pub const MAX_NAME_LEN: usize = 200;

// ─── Local ───────────────────────────────────────────────────────────────────

/// One persisted row of the `regionais` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalRecord {
  /// Surrogate key assigned by the store.
  pub id:          i64,
  /// Identifier in the upstream system. Shared by every version of a
  /// regional; at most one of them is active.
  pub external_id: i64,
  pub name:        String,
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

// ─── Upstream ────────────────────────────────────────────────────────────────

/// One entry of an upstream snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRegional {
  pub external_id: i64,
  pub name:        String,
}

impl ExternalRegional {
  pub fn new(external_id: i64, name: impl Into<String>) -> Self {
    Self { external_id, name: name.into() }
  }
}

/// Drop repeated `external_id`s from a snapshot, keeping the first
/// occurrence. Relative order of the survivors is preserved.
pub fn dedupe_snapshot(snapshot: Vec<ExternalRegional>) -> Vec<ExternalRegional> {
  let mut seen = std::collections::HashSet::with_capacity(snapshot.len());
  snapshot
    .into_iter()
    .filter(|r| seen.insert(r.external_id))
    .collect()
}

/// Whether `name` fits in the local `name` column.
pub fn name_fits(name: &str) -> bool { name.chars().count() <= MAX_NAME_LEN }
