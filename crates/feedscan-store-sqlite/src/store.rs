//! [`SqliteStore`], the SQLite implementation of [`DedupStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use feedscan_core::{
  record::{Insertion, PendingPost, Post, PostKind, RecordCounts, RecordKind},
  store::{CheckpointCommit, DedupStore},
  subject::{Checkpoint, Subject},
};

use crate::{
  encode::{
    decode_checkpoint, encode_checkpoint, encode_depth, encode_dt, encode_post_kind,
    RawPost, RawSubject, STATE_DONE, STATE_RESUMABLE,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Insert classification ───────────────────────────────────────────────────

/// How a keyed `INSERT` ended, decided on the connection thread so the
/// row ID is read before any other statement can run.
enum RawInsert {
  Inserted(i64),
  UniqueViolation,
  MissingParent,
}

fn insert_keyed<P: rusqlite::Params>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: P,
) -> rusqlite::Result<RawInsert> {
  match conn.execute(sql, params) {
    Ok(_) => Ok(RawInsert::Inserted(conn.last_insert_rowid())),
    Err(rusqlite::Error::SqliteFailure(e, _))
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
    {
      Ok(RawInsert::UniqueViolation)
    }
    Err(rusqlite::Error::SqliteFailure(e, _))
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
    {
      Ok(RawInsert::MissingParent)
    }
    Err(e) => Err(e),
  }
}

fn resolve_insert(raw: RawInsert, kind: RecordKind, key: &str) -> Result<Insertion> {
  match raw {
    RawInsert::Inserted(id) => Ok(Insertion::Inserted(id)),
    RawInsert::UniqueViolation => Ok(Insertion::duplicate(kind, key)),
    RawInsert::MissingParent => {
      Err(Error::DanglingReference { kind, key: key.to_owned() })
    }
  }
}

/// Whether `proposed` may replace the stored checkpoint. `Done` ranks above
/// every depth; equal values are accepted.
fn may_replace(stored_state: &str, stored_depth: i64, proposed: Checkpoint) -> bool {
  match (stored_state == STATE_DONE, proposed) {
    (true, Checkpoint::Done) => true,
    (true, Checkpoint::Depth(_)) => false,
    (false, Checkpoint::Done) => true,
    (false, Checkpoint::Depth(d)) => encode_depth(d) >= stored_depth,
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A feedscan store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted, and every
/// clone funnels into the same connection thread.
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

  /// Open an in-memory store, for tests.
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

  async fn subject_where(
    &self,
    clause: &'static str,
    param: rusqlite::types::Value,
  ) -> Result<Option<Subject>> {
    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM subjects WHERE {clause}", RawSubject::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawSubject::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }
}

// ─── DedupStore impl ─────────────────────────────────────────────────────────

impl DedupStore for SqliteStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn create_subject(&self, name: &str) -> Result<Insertion> {
    let name_owned = name.to_owned();
    let at_str     = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(insert_keyed(
          conn,
          "INSERT INTO subjects (name, checkpoint, scan_state, created_at)
           VALUES (?1, 0, ?2, ?3)",
          rusqlite::params![name_owned, STATE_RESUMABLE, at_str],
        )?)
      })
      .await?;

    resolve_insert(raw, RecordKind::Subject, name)
  }

  async fn get_subject(&self, subject_id: i64) -> Result<Option<Subject>> {
    self.subject_where("subject_id = ?1", subject_id.into()).await
  }

  async fn find_subject(&self, name: &str) -> Result<Option<Subject>> {
    self.subject_where("name = ?1", name.to_owned().into()).await
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let raws: Vec<RawSubject> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM subjects ORDER BY subject_id",
          RawSubject::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  // ── Posts and media ───────────────────────────────────────────────────────

  async fn record_post(
    &self,
    natural_key: &str,
    subject_id:  i64,
    kind:        PostKind,
  ) -> Result<Insertion> {
    let key_owned = natural_key.to_owned();
    let kind_str  = encode_post_kind(kind);
    let at_str    = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(insert_keyed(
          conn,
          "INSERT INTO posts (natural_key, subject_id, kind, recorded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![key_owned, subject_id, kind_str, at_str],
        )?)
      })
      .await?;

    resolve_insert(raw, RecordKind::Post, natural_key)
  }

  async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT post_id, natural_key, subject_id, kind, recorded_at
               FROM posts WHERE post_id = ?1",
              rusqlite::params![post_id],
              |row| {
                Ok(RawPost {
                  post_id:     row.get(0)?,
                  natural_key: row.get(1)?,
                  subject_id:  row.get(2)?,
                  kind:        row.get(3)?,
                  recorded_at: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn update_post_kind(&self, post_id: i64, kind: PostKind) -> Result<()> {
    let kind_str = encode_post_kind(kind);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE posts SET kind = ?1 WHERE post_id = ?2",
          rusqlite::params![kind_str, post_id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::PostNotFound(post_id));
    }
    Ok(())
  }

  async fn record_media(
    &self,
    natural_key: &str,
    post_id:     i64,
    subject_id:  i64,
  ) -> Result<Insertion> {
    let key_owned = natural_key.to_owned();
    let at_str    = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(insert_keyed(
          conn,
          "INSERT INTO media (natural_key, post_id, subject_id, recorded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![key_owned, post_id, subject_id, at_str],
        )?)
      })
      .await?;

    resolve_insert(raw, RecordKind::Media, natural_key)
  }

  async fn pending_posts(&self, limit: usize) -> Result<Vec<PendingPost>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);
    let unknown   = encode_post_kind(PostKind::Unknown);

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT natural_key, post_id, subject_id
           FROM posts
           WHERE kind = ?1
           ORDER BY post_id
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![unknown, limit_val], |row| {
            Ok(PendingPost {
              natural_key: row.get(0)?,
              post_id:     row.get(1)?,
              subject_id:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows)
  }

  async fn counts(&self) -> Result<RecordCounts> {
    let (subjects, posts, media): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT (SELECT COUNT(*) FROM subjects),
                  (SELECT COUNT(*) FROM posts),
                  (SELECT COUNT(*) FROM media)",
          [],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?)
      })
      .await?;

    Ok(RecordCounts {
      subjects: subjects.unsigned_abs(),
      posts:    posts.unsigned_abs(),
      media:    media.unsigned_abs(),
    })
  }

  // ── Checkpoints ───────────────────────────────────────────────────────────

  async fn commit_checkpoint(
    &self,
    subject_id: i64,
    checkpoint: Checkpoint,
  ) -> Result<CheckpointCommit> {
    let (state_str, depth) = encode_checkpoint(checkpoint);

    // (stored_state, stored_depth, applied), read and written in one
    // immediate transaction so a concurrent writer cannot interleave.
    let row: Option<(String, i64, bool)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored: Option<(String, i64)> = tx
          .query_row(
            "SELECT scan_state, checkpoint FROM subjects WHERE subject_id = ?1",
            rusqlite::params![subject_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let Some((stored_state, stored_depth)) = stored else {
          return Ok(None);
        };

        let applied = may_replace(&stored_state, stored_depth, checkpoint);
        if applied {
          tx.execute(
            "UPDATE subjects
             SET scan_state = ?1, checkpoint = COALESCE(?2, checkpoint)
             WHERE subject_id = ?3",
            rusqlite::params![state_str, depth, subject_id],
          )?;
        }
        tx.commit()?;
        Ok(Some((stored_state, stored_depth, applied)))
      })
      .await?;

    let (stored_state, stored_depth, applied) =
      row.ok_or(Error::SubjectNotFound(subject_id))?;
    let stored = decode_checkpoint(&stored_state, stored_depth)?;

    Ok(if applied {
      CheckpointCommit::Committed { previous: stored }
    } else {
      CheckpointCommit::Rejected { current: stored }
    })
  }

  async fn reset_checkpoint(&self, subject_id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM subjects WHERE subject_id = ?1",
            rusqlite::params![subject_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }
        let changed = tx.execute(
          "UPDATE subjects SET scan_state = ?1, checkpoint = 0
           WHERE subject_id = ?2 AND scan_state = ?3",
          rusqlite::params![STATE_RESUMABLE, subject_id, STATE_DONE],
        )?;
        tx.commit()?;
        Ok(Some(changed > 0))
      })
      .await?;

    changed.ok_or(Error::SubjectNotFound(subject_id))
  }
}
