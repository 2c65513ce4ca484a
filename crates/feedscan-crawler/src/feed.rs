//! A [`FeedSource`] that replays recorded feeds from disk.
//!
//! A recording captures what a rendered infinite-scroll feed looked like: the
//! total page height and every cell with its vertical offset and the links
//! inside it. Scrolling moves a fixed step and clamps to the page height, the
//! way a browser clamps `scrollTo` to the document height. A snapshot holds
//! the cells inside the viewport at the current depth.
//!
//! Recordings live at `<feed_dir>/<subject>.json`, or
//! `<feed_dir>/<subject>/<extension>.json` when an extension path such as
//! `/with_replies` is requested.

use std::{
  io,
  path::{Path, PathBuf},
};

use feedscan_core::source::FeedSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SCROLL_STEP: u64 = 1500;

// ─── Recording format ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub href:  String,
  /// `src` of an image nested in the anchor, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
  pub offset: u64,
  #[serde(default)]
  pub links:  Vec<Link>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
  pub height: u64,
  #[serde(default)]
  pub cells:  Vec<Cell>,
}

/// The rendered part of a feed at one depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
  pub depth: u64,
  pub cells: Vec<Cell>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FeedError {
  #[error("no recording at {}", .0.display())]
  NotRecorded(PathBuf),

  #[error("reading {}: {source}", path.display())]
  Io { path: PathBuf, source: io::Error },

  #[error("parsing {}: {source}", path.display())]
  Json { path: PathBuf, source: serde_json::Error },

  #[error("no feed is open")]
  NotOpen,
}

// ─── Source ──────────────────────────────────────────────────────────────────

pub struct RecordedFeed {
  dir:      PathBuf,
  step:     u64,
  viewport: u64,
  page:     Option<Recording>,
  depth:    u64,
}

impl RecordedFeed {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir:      dir.into(),
      step:     DEFAULT_SCROLL_STEP,
      viewport: DEFAULT_SCROLL_STEP,
      page:     None,
      depth:    0,
    }
  }

  /// Scroll distance per advance; the viewport is kept the same height.
  pub fn with_step(mut self, step: u64) -> Self {
    self.step = step.max(1);
    self.viewport = self.step;
    self
  }

  pub fn recording_path(&self, subject: &str, extension_path: &str) -> PathBuf {
    recording_path(&self.dir, subject, extension_path)
  }
}

fn recording_path(dir: &Path, subject: &str, extension_path: &str) -> PathBuf {
  let extension = extension_path.trim_matches('/');
  if extension.is_empty() {
    dir.join(format!("{subject}.json"))
  } else {
    dir.join(subject).join(format!("{extension}.json"))
  }
}

impl FeedSource for RecordedFeed {
  type Snapshot = PageSnapshot;
  type Error = FeedError;

  async fn open(&mut self, subject: &str, extension_path: &str) -> Result<(), FeedError> {
    self.page = None;
    self.depth = 0;

    let path = self.recording_path(subject, extension_path);
    let raw = match tokio::fs::read_to_string(&path).await {
      Ok(raw) => raw,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(FeedError::NotRecorded(path));
      }
      Err(source) => return Err(FeedError::Io { path, source }),
    };
    let recording: Recording =
      serde_json::from_str(&raw).map_err(|source| FeedError::Json { path, source })?;

    self.page = Some(recording);
    Ok(())
  }

  async fn advance(&mut self, current_depth: u64) -> Result<u64, FeedError> {
    let page = self.page.as_ref().ok_or(FeedError::NotOpen)?;
    self.depth = current_depth.saturating_add(self.step).min(page.height);
    Ok(self.depth)
  }

  async fn snapshot(&mut self) -> Result<PageSnapshot, FeedError> {
    let page = self.page.as_ref().ok_or(FeedError::NotOpen)?;
    let top = self.depth;
    let bottom = top.saturating_add(self.viewport);
    let cells = page
      .cells
      .iter()
      .filter(|c| c.offset >= top && c.offset < bottom)
      .cloned()
      .collect();
    Ok(PageSnapshot { depth: top, cells })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cell(offset: u64) -> Cell {
    Cell {
      offset,
      links: vec![Link { href: format!("/alice/status/{offset}"), image: None }],
    }
  }

  fn write_recording(dir: &Path, name: &str, recording: &Recording) {
    std::fs::write(dir.join(name), serde_json::to_string(recording).unwrap()).unwrap();
  }

  #[test]
  fn path_layout() {
    let dir = Path::new("/feeds");
    assert_eq!(recording_path(dir, "alice", ""), PathBuf::from("/feeds/alice.json"));
    assert_eq!(
      recording_path(dir, "alice", "/with_replies"),
      PathBuf::from("/feeds/alice/with_replies.json")
    );
  }

  #[tokio::test]
  async fn scrolls_in_steps_and_clamps_to_height() {
    let dir = tempfile::tempdir().unwrap();
    let recording = Recording {
      height: 4000,
      cells:  vec![cell(0), cell(1400), cell(1600), cell(3900)],
    };
    write_recording(dir.path(), "alice.json", &recording);

    let mut feed = RecordedFeed::new(dir.path());
    feed.open("alice", "").await.unwrap();

    let top = feed.snapshot().await.unwrap();
    assert_eq!(top.depth, 0);
    assert_eq!(top.cells.len(), 2);

    assert_eq!(feed.advance(0).await.unwrap(), 1500);
    assert_eq!(feed.snapshot().await.unwrap().cells, vec![cell(1600)]);
    assert_eq!(feed.advance(1500).await.unwrap(), 3000);
    assert_eq!(feed.advance(3000).await.unwrap(), 4000);
    assert_eq!(feed.advance(4000).await.unwrap(), 4000);
    assert!(feed.snapshot().await.unwrap().cells.is_empty());
  }

  #[tokio::test]
  async fn missing_recording_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut feed = RecordedFeed::new(dir.path());
    let err = feed.open("nobody", "/with_replies").await.unwrap_err();
    assert!(matches!(err, FeedError::NotRecorded(p) if p.ends_with("nobody/with_replies.json")));
    assert!(matches!(feed.advance(0).await, Err(FeedError::NotOpen)));
  }

  #[tokio::test]
  async fn malformed_recording_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alice.json"), "{ not json").unwrap();
    let mut feed = RecordedFeed::new(dir.path());
    assert!(matches!(feed.open("alice", "").await, Err(FeedError::Json { .. })));
  }
}
