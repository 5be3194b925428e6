//! SQL schema for the regional SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Rows are never deleted. A rename inactivates the current row and inserts
-- a new one, so `external_id` repeats across versions.
CREATE TABLE IF NOT EXISTS regionais (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id INTEGER NOT NULL,
    name        TEXT    NOT NULL,
    active      INTEGER NOT NULL DEFAULT 1,   -- 0 | 1
    created_at  TEXT    NOT NULL,             -- RFC 3339 UTC, microseconds
    updated_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS regionais_external_active_idx
    ON regionais(external_id, active);
CREATE INDEX IF NOT EXISTS regionais_active_idx
    ON regionais(active);

-- At most one active version per upstream key.
CREATE UNIQUE INDEX IF NOT EXISTS regionais_one_active_idx
    ON regionais(external_id) WHERE active = 1;

PRAGMA user_version = 1;
";
