//! Post and media records, and the outcome of inserting one.
//!
//! Records are append-only. The only mutable column is a post's `kind`, which
//! moves from [`PostKind::Unknown`] to a concrete kind once the post has been
//! classified.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Error;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// What a post turned out to contain.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
  /// Not classified yet.
  #[default]
  Unknown,
  Media,
  NonMedia,
}

impl PostKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Unknown => "unknown",
      Self::Media => "media",
      Self::NonMedia => "non_media",
    }
  }

  /// Whether a post currently of this kind may be set to `next`.
  ///
  /// Only `Unknown` may change, and only to a concrete kind. Re-applying the
  /// current kind is allowed and changes nothing.
  pub fn can_become(self, next: PostKind) -> bool {
    self == next || (self == Self::Unknown && next != Self::Unknown)
  }
}

impl fmt::Display for PostKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PostKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "unknown" => Ok(Self::Unknown),
      "media" => Ok(Self::Media),
      "non_media" | "non-media" => Ok(Self::NonMedia),
      other => Err(Error::UnknownPostKind(other.to_owned())),
    }
  }
}

/// The three record tables, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
  Subject,
  Post,
  Media,
}

impl fmt::Display for RecordKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Subject => "subject",
      Self::Post => "post",
      Self::Media => "media",
    })
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A post seen in a subject's feed. `natural_key` is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:     i64,
  pub natural_key: String,
  pub subject_id:  i64,
  pub kind:        PostKind,
  pub recorded_at: DateTime<Utc>,
}

/// A media item attached to a post, keyed by its canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
  pub media_id:    i64,
  pub natural_key: String,
  pub post_id:     i64,
  pub subject_id:  i64,
  pub recorded_at: DateTime<Utc>,
}

/// A post still waiting for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPost {
  pub natural_key: String,
  pub post_id:     i64,
  pub subject_id:  i64,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
  pub subjects: u64,
  pub posts:    u64,
  pub media:    u64,
}

// ─── Insertion outcome ───────────────────────────────────────────────────────

/// A natural key that was already present; the insert changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} {key:?} is already recorded")]
pub struct DuplicateError {
  pub kind: RecordKind,
  pub key:  String,
}

/// Result of an insert keyed by a natural key.
///
/// A duplicate is an expected outcome of re-crawling, so it is a value rather
/// than a store error. Store failures travel in the outer `Result`.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
  /// Freshly inserted under this surrogate ID.
  Inserted(i64),
  Duplicate(DuplicateError),
}

impl Insertion {
  pub fn duplicate(kind: RecordKind, key: impl Into<String>) -> Self {
    Self::Duplicate(DuplicateError { kind, key: key.into() })
  }

  pub fn id(&self) -> Option<i64> {
    match self {
      Self::Inserted(id) => Some(*id),
      Self::Duplicate(_) => None,
    }
  }

  pub fn is_duplicate(&self) -> bool { matches!(self, Self::Duplicate(_)) }

  pub fn into_result(self) -> Result<i64, DuplicateError> {
    match self {
      Self::Inserted(id) => Ok(id),
      Self::Duplicate(e) => Err(e),
    }
  }
}
