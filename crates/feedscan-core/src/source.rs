//! The external collaborators the crawler drives: a feed source that renders
//! and scrolls a subject's feed, and an extractor that turns a rendered page
//! into candidate records.

use std::{collections::BTreeSet, future::Future};

/// A navigable, scrollable feed.
///
/// One source holds one navigation context, so it is driven by one subject
/// at a time. Depth is the source's own progress unit (e.g. scroll offset in
/// pixels); callers only ever compare depths.
pub trait FeedSource: Send {
  /// The rendered page handed to the [`Extractor`].
  type Snapshot: Send;
  type Error: std::error::Error + Send + Sync + 'static;

  /// Navigate to `subject`'s feed at `extension_path` (e.g. `/with_replies`).
  fn open<'a>(
    &'a mut self,
    subject: &'a str,
    extension_path: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Scroll forward from `current_depth` and report the depth reached.
  /// May return `current_depth` (or less) when the feed did not move.
  fn advance(
    &mut self,
    current_depth: u64,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Capture the currently rendered page.
  fn snapshot(
    &mut self,
  ) -> impl Future<Output = Result<Self::Snapshot, Self::Error>> + Send + '_;
}

/// A post found on a page, with the media keys found alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
  pub post_key:   String,
  pub media_keys: BTreeSet<String>,
}

impl Candidate {
  pub fn new(post_key: impl Into<String>) -> Self {
    Self { post_key: post_key.into(), media_keys: BTreeSet::new() }
  }

  pub fn with_media<I, K>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = K>,
    K: Into<String>,
  {
    self.media_keys.extend(keys.into_iter().map(Into::into));
    self
  }
}

/// Everything extracted from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
  /// Depth of the page the candidates came from.
  pub depth:      u64,
  pub candidates: Vec<Candidate>,
}

/// Pure translation of a snapshot into candidates: no I/O, no side effects.
pub trait Extractor<S> {
  fn extract(&self, subject: &str, snapshot: &S) -> Extraction;
}
