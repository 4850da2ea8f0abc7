//! SQL schema for the Newswire SQLite store.
//!
//! Migrations are applied in order at connection startup, gated on
//! `PRAGMA user_version`. Entry `n` of [`MIGRATIONS`] upgrades a database from
//! version `n` to `n + 1`. Never edit a released migration; append a new one.

/// Connection-level settings; run on every open, outside any transaction.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
";

pub const MIGRATIONS: &[&str] = &[V1];

/// The schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

const V1: &str = "
CREATE TABLE live_events (
    event_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name              TEXT    NOT NULL,
    category          TEXT    NOT NULL DEFAULT '',   -- normalised path, e.g. 'sports/football'
    status            TEXT    NOT NULL DEFAULT 'live'
                      CHECK (status IN ('live', 'completed')),
    description       TEXT    NOT NULL DEFAULT '',
    venue             TEXT,
    start_time        TEXT    NOT NULL,              -- RFC 3339 UTC, fixed width
    scheduled_end     TEXT,
    last_updated      TEXT    NOT NULL,
    completed_at      TEXT,
    completion_reason TEXT,
    version           INTEGER NOT NULL DEFAULT 0     -- optimistic-concurrency token
);

CREATE INDEX live_events_status_idx ON live_events(status, category);
CREATE INDEX live_events_name_idx   ON live_events(name, status);

-- No foreign key: the parent is checked on insert, and orphans carried over
-- from older databases are purged by the deduplicator.
CREATE TABLE event_updates (
    update_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id   INTEGER NOT NULL,
    timestamp  TEXT    NOT NULL,
    title      TEXT,
    content    TEXT    NOT NULL DEFAULT '',
    importance REAL    NOT NULL DEFAULT 0.5
);

CREATE INDEX event_updates_event_idx ON event_updates(event_id, timestamp);

-- Articles are immutable once written.
CREATE TABLE articles (
    article_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT    NOT NULL,
    body            TEXT    NOT NULL DEFAULT '',
    summary         TEXT,
    category        TEXT    NOT NULL DEFAULT '',
    source_label    TEXT    NOT NULL,
    tags            TEXT    NOT NULL DEFAULT '[]',   -- JSON array
    source_event_id INTEGER,                         -- NULL for authored articles
    created_at      TEXT    NOT NULL
);

-- One article per archived event.
CREATE UNIQUE INDEX articles_source_event_idx
    ON articles(source_event_id) WHERE source_event_id IS NOT NULL;
CREATE INDEX articles_created_idx ON articles(created_at);
";
