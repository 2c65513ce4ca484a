//! Subjects: independently scanned feeds and their durable checkpoints.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far a subject's feed has been confirmed scanned.
///
/// Variant order matters: the derived [`Ord`] ranks every depth below
/// [`Checkpoint::Done`], which is exactly the order checkpoint commits must
/// respect.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "state", content = "depth", rename_all = "snake_case")]
pub enum Checkpoint {
  /// Highest depth at which extraction is known to have completed.
  Depth(u64),
  /// The feed was scanned to its end; never resume.
  Done,
}

impl Checkpoint {
  pub const START: Self = Self::Depth(0);

  pub fn is_done(&self) -> bool { matches!(self, Self::Done) }

  /// The bounded depth, or `None` for [`Checkpoint::Done`].
  pub fn depth(&self) -> Option<u64> {
    match self {
      Self::Depth(d) => Some(*d),
      Self::Done => None,
    }
  }
}

impl Default for Checkpoint {
  fn default() -> Self { Self::START }
}

impl fmt::Display for Checkpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Depth(d) => write!(f, "{d}"),
      Self::Done => f.write_str("done"),
    }
  }
}

/// A named feed owner. `name` is the natural key; `subject_id` is the
/// store-assigned surrogate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: i64,
  pub name:       String,
  pub checkpoint: Checkpoint,
  pub created_at: DateTime<Utc>,
}
