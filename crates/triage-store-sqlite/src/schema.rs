//! SQL schema for the Triage SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Rows are never removed; deletion only sets is_deleted.
CREATE TABLE IF NOT EXISTS sla_policies (
    policy_id        TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    description      TEXT,
    position         INTEGER NOT NULL CHECK (position >= 0),
    filter_priority  TEXT,             -- 'urgent' | 'high' | 'normal' | 'low'
    filter_group_id  TEXT,
    filter_type      TEXT,
    filter_source    TEXT,
    metrics_json     TEXT NOT NULL DEFAULT '[]',
    is_deleted       INTEGER NOT NULL DEFAULT 0,
    deleted_at       TEXT,
    created_at       TEXT NOT NULL,    -- ISO 8601 UTC; server-assigned
    updated_at       TEXT NOT NULL,
    created_seq      INTEGER NOT NULL UNIQUE
);

-- Single-row bookkeeping: the collection version (bumped by every mutation)
-- and the next creation sequence number.
CREATE TABLE IF NOT EXISTS policy_store_meta (
    singleton INTEGER PRIMARY KEY CHECK (singleton = 0),
    version   INTEGER NOT NULL,
    next_seq  INTEGER NOT NULL
);

INSERT OR IGNORE INTO policy_store_meta (singleton, version, next_seq)
VALUES (0, 0, 1);

CREATE INDEX IF NOT EXISTS sla_policies_order_idx
    ON sla_policies(is_deleted, position, created_seq);

PRAGMA user_version = 1;
";
