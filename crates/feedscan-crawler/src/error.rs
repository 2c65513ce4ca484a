//! Error types for the crawler.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The store failed; fatal to the whole run.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] BoxError),

  /// Navigation or scrolling failed; fatal to the current subject only.
  #[error("feed source unavailable for {subject:?}: {source}")]
  SourceUnavailable { subject: String, source: BoxError },

  #[error("post not found: {0}")]
  PostNotFound(i64),

  #[error(transparent)]
  Core(#[from] feedscan_core::Error),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(e))
  }

  pub fn feed<E>(subject: &str, e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::SourceUnavailable { subject: subject.to_owned(), source: Box::new(e) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
