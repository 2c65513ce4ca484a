//! Error types for `feedscan-core`.

use thiserror::Error;

use crate::record::{DuplicateError, PostKind};

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Duplicate(#[from] DuplicateError),

  #[error("unknown post kind: {0:?}")]
  UnknownPostKind(String),

  #[error("refusing to change post {post_id} from {from} to {to}")]
  KindDowngrade {
    post_id: i64,
    from:    PostKind,
    to:      PostKind,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
