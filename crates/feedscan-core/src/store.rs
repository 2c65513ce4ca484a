//! The `DedupStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g.
//! `feedscan-store-sqlite`). The crawler depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  record::{Insertion, PendingPost, Post, PostKind, RecordCounts},
  subject::{Checkpoint, Subject},
};

/// Outcome of [`DedupStore::commit_checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointCommit {
  /// The new value is stored. `previous` may equal it when the commit
  /// restated the current checkpoint.
  Committed { previous: Checkpoint },
  /// The stored value is ahead of the proposed one; nothing changed.
  Rejected { current: Checkpoint },
}

impl CheckpointCommit {
  pub fn is_committed(&self) -> bool { matches!(self, Self::Committed { .. }) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable, deduplicating storage for subjects, posts and media.
///
/// Every insert is keyed by a natural key and either allocates the next
/// surrogate ID for its table or reports [`Insertion::Duplicate`]. Surrogate
/// IDs increase strictly per table and are never reused. All operations are
/// atomic with respect to concurrent callers sharing the store.
///
/// All methods return `Send` futures so the store can be shared across tasks
/// of a multi-threaded runtime.
pub trait DedupStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Register a subject with checkpoint `0`.
  fn create_subject<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Insertion, Self::Error>> + Send + 'a;

  /// Retrieve a subject by surrogate ID. Returns `None` if not found.
  fn get_subject(
    &self,
    subject_id: i64,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Retrieve a subject by name. Returns `None` if not found.
  fn find_subject<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  /// All subjects, ordered by surrogate ID.
  fn list_subjects(
    &self,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  // ── Posts and media ───────────────────────────────────────────────────

  /// Record a post. A duplicate natural key leaves the existing post,
  /// including its kind, untouched.
  fn record_post<'a>(
    &'a self,
    natural_key: &'a str,
    subject_id: i64,
    kind: PostKind,
  ) -> impl Future<Output = Result<Insertion, Self::Error>> + Send + 'a;

  /// Retrieve a post by surrogate ID. Returns `None` if not found.
  fn get_post(
    &self,
    post_id: i64,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Overwrite a post's kind unconditionally. Callers own the no-downgrade
  /// policy (see [`PostKind::can_become`]).
  fn update_post_kind(
    &self,
    post_id: i64,
    kind: PostKind,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record a media item belonging to `post_id`.
  fn record_media<'a>(
    &'a self,
    natural_key: &'a str,
    post_id: i64,
    subject_id: i64,
  ) -> impl Future<Output = Result<Insertion, Self::Error>> + Send + 'a;

  /// Up to `limit` posts still of kind [`PostKind::Unknown`], oldest first.
  fn pending_posts(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<PendingPost>, Self::Error>> + Send + '_;

  /// Row counts of every table.
  fn counts(
    &self,
  ) -> impl Future<Output = Result<RecordCounts, Self::Error>> + Send + '_;

  // ── Checkpoints ───────────────────────────────────────────────────────

  /// Store `checkpoint` unless the current value ranks above it.
  ///
  /// This is the single point of checkpoint mutation during crawling, so it
  /// is where monotonicity is enforced: depths only grow, and nothing but
  /// [`DedupStore::reset_checkpoint`] leaves [`Checkpoint::Done`].
  fn commit_checkpoint(
    &self,
    subject_id: i64,
    checkpoint: Checkpoint,
  ) -> impl Future<Output = Result<CheckpointCommit, Self::Error>> + Send + '_;

  /// Administrative reset of a fully scanned subject back to depth `0`.
  ///
  /// Returns `false` (and changes nothing) unless the subject is currently
  /// [`Checkpoint::Done`].
  fn reset_checkpoint(
    &self,
    subject_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
