//! SQL schema for the feedscan SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `AUTOINCREMENT` guarantees surrogate IDs are never reused, even for rows
/// that were rolled back or rejected.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL UNIQUE,
    checkpoint  INTEGER NOT NULL DEFAULT 0,   -- last confirmed depth
    scan_state  TEXT    NOT NULL DEFAULT 'resumable'
                CHECK (scan_state IN ('resumable', 'done')),
    created_at  TEXT    NOT NULL
);

-- Posts and media are append-only apart from posts.kind.
CREATE TABLE IF NOT EXISTS posts (
    post_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    natural_key TEXT    NOT NULL UNIQUE,
    subject_id  INTEGER NOT NULL REFERENCES subjects(subject_id),
    kind        TEXT    NOT NULL DEFAULT 'unknown',  -- 'unknown' | 'media' | 'non_media'
    recorded_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS media (
    media_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    natural_key TEXT    NOT NULL UNIQUE,
    post_id     INTEGER NOT NULL REFERENCES posts(post_id),
    subject_id  INTEGER NOT NULL REFERENCES subjects(subject_id),
    recorded_at TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS posts_kind_idx    ON posts(kind, post_id);
CREATE INDEX IF NOT EXISTS posts_subject_idx ON posts(subject_id);
CREATE INDEX IF NOT EXISTS media_post_idx    ON media(post_id);

PRAGMA user_version = 1;
";
