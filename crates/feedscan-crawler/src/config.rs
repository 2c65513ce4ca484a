//! Runtime configuration, deserialised from `feedscan.toml` and
//! `FEEDSCAN_*` environment variables.

use std::{
  collections::HashSet,
  io,
  path::{Path, PathBuf},
  time::Duration,
};

use feedscan_core::scheduler::ScrollPolicy;
use serde::Deserialize;
use tracing::warn;

use crate::feed::DEFAULT_SCROLL_STEP;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
  pub store_path:     PathBuf,
  /// Directory holding recorded feeds, one file per subject.
  pub feed_dir:       PathBuf,
  /// Feed variant appended to the subject's path, e.g. `/with_replies`.
  pub extension_path: String,
  /// Settle time before each page is read.
  pub page_delay_ms:  u64,
  pub scroll_step:    u64,
  pub scroll:         ScrollPolicy,
}

impl Default for CrawlerConfig {
  fn default() -> Self {
    Self {
      store_path:     PathBuf::from("feedscan.db"),
      feed_dir:       PathBuf::from("feeds"),
      extension_path: "/with_replies".to_owned(),
      page_delay_ms:  0,
      scroll_step:    DEFAULT_SCROLL_STEP,
      scroll:         ScrollPolicy::default(),
    }
  }
}

impl CrawlerConfig {
  /// Layer `path` (optional) under the environment. Nested keys use a double
  /// underscore: `FEEDSCAN_SCROLL__MAX_TRIALS=8`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    let mut cfg: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("FEEDSCAN")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()?;

    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.feed_dir = expand_tilde(&cfg.feed_dir);
    Ok(cfg)
  }

  pub fn page_delay(&self) -> Duration { Duration::from_millis(self.page_delay_ms) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

/// Read a subject list: one name per line, blank lines and `#` comments
/// skipped, repeated names dropped.
pub async fn load_subject_list(path: &Path) -> io::Result<Vec<String>> {
  let raw = tokio::fs::read_to_string(path).await?;

  let mut seen = HashSet::new();
  let mut names = Vec::new();
  for line in raw.lines().map(str::trim) {
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    if !seen.insert(line) {
      warn!(name = line, "listed more than once");
      continue;
    }
    names.push(line.to_owned());
  }
  Ok(names)
}
