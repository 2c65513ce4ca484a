//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. A checkpoint spans two columns: the
//! depth and a `scan_state` tag, so `Done` never masquerades as a depth.

use chrono::{DateTime, Utc};
use feedscan_core::{
  record::{Post, PostKind},
  subject::{Checkpoint, Subject},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Depth ───────────────────────────────────────────────────────────────────

/// SQLite integers are signed; depths beyond `i64::MAX` saturate.
pub fn encode_depth(depth: u64) -> i64 { i64::try_from(depth).unwrap_or(i64::MAX) }

pub fn decode_depth(raw: i64) -> Result<u64> {
  u64::try_from(raw).map_err(|_| Error::Decode(format!("negative depth: {raw}")))
}

// ─── Checkpoint ──────────────────────────────────────────────────────────────

pub const STATE_RESUMABLE: &str = "resumable";
pub const STATE_DONE: &str = "done";

/// Returns `(scan_state, depth)`. `Done` carries no depth of its own; the
/// caller keeps whatever depth column was there.
pub fn encode_checkpoint(c: Checkpoint) -> (&'static str, Option<i64>) {
  match c {
    Checkpoint::Depth(d) => (STATE_RESUMABLE, Some(encode_depth(d))),
    Checkpoint::Done => (STATE_DONE, None),
  }
}

pub fn decode_checkpoint(state: &str, depth: i64) -> Result<Checkpoint> {
  match state {
    STATE_RESUMABLE => Ok(Checkpoint::Depth(decode_depth(depth)?)),
    STATE_DONE => Ok(Checkpoint::Done),
    other => Err(Error::Decode(format!("unknown scan state: {other:?}"))),
  }
}

// ─── PostKind ────────────────────────────────────────────────────────────────

pub fn encode_post_kind(k: PostKind) -> &'static str { k.as_str() }

pub fn decode_post_kind(s: &str) -> Result<PostKind> { Ok(s.parse()?) }

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Row shape read straight out of `subjects`.
pub struct RawSubject {
  pub subject_id: i64,
  pub name:       String,
  pub checkpoint: i64,
  pub scan_state: String,
  pub created_at: String,
}

impl RawSubject {
  pub const COLUMNS: &'static str =
    "subject_id, name, checkpoint, scan_state, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      name:       row.get(1)?,
      checkpoint: row.get(2)?,
      scan_state: row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: self.subject_id,
      name:       self.name,
      checkpoint: decode_checkpoint(&self.scan_state, self.checkpoint)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Row shape read straight out of `posts`.
pub struct RawPost {
  pub post_id:     i64,
  pub natural_key: String,
  pub subject_id:  i64,
  pub kind:        String,
  pub recorded_at: String,
}

impl RawPost {
  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:     self.post_id,
      natural_key: self.natural_key,
      subject_id:  self.subject_id,
      kind:        decode_post_kind(&self.kind)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
