//! Error type for `feedscan-store-sqlite`.

use feedscan_core::record::RecordKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] feedscan_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("invalid stored value: {0}")]
  Decode(String),

  #[error("subject not found: {0}")]
  SubjectNotFound(i64),

  #[error("post not found: {0}")]
  PostNotFound(i64),

  /// An insert referenced a parent row that does not exist.
  #[error("{kind} {key:?} references a missing parent row")]
  DanglingReference { kind: RecordKind, key: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
