//! The crawl orchestrator: drives each subject's feed through extraction,
//! deduplicating persistence and the scroll scheduler.

use std::time::Duration;

use feedscan_core::{
  record::{Insertion, PostKind},
  scheduler::{ScrollPolicy, ScrollScheduler},
  source::{Candidate, Extractor, FeedSource},
  store::{CheckpointCommit, DedupStore},
  subject::{Checkpoint, Subject},
};
use serde::Serialize;
use tracing::{Instrument as _, debug, info, info_span, warn};

use crate::{Error, Result};

// ─── Settings ────────────────────────────────────────────────────────────────

/// What to do with subjects whose checkpoint is [`Checkpoint::Done`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RescanMode {
  /// Leave them alone.
  #[default]
  Skip,
  /// Reset them to depth `0` and scan them in full.
  Reset,
  /// Scan them for new posts without touching their checkpoint.
  Refresh,
}

#[derive(Debug, Clone)]
pub struct CrawlSettings {
  pub policy:         ScrollPolicy,
  pub extension_path: String,
  pub page_delay:     Duration,
  pub rescan:         RescanMode,
}

impl Default for CrawlSettings {
  fn default() -> Self {
    Self {
      policy:         ScrollPolicy::default(),
      extension_path: String::new(),
      page_delay:     Duration::ZERO,
      rescan:         RescanMode::Skip,
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubjectOutcome {
  /// The trial budget ran out; the subject is finished for this run.
  Exhausted,
  /// The feed source failed; the checkpoint is left as last committed.
  Aborted { reason: String },
  /// Already fully scanned and not selected for rescanning.
  Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectReport {
  pub name:        String,
  pub subject_id:  i64,
  #[serde(flatten)]
  pub outcome:     SubjectOutcome,
  pub pages:       u32,
  pub posts_added: u64,
  pub media_added: u64,
  pub checkpoint:  Checkpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub subjects: Vec<SubjectReport>,
}

impl RunReport {
  pub fn posts_added(&self) -> u64 { self.subjects.iter().map(|s| s.posts_added).sum() }

  pub fn media_added(&self) -> u64 { self.subjects.iter().map(|s| s.media_added).sum() }

  pub fn aborted(&self) -> usize {
    self
      .subjects
      .iter()
      .filter(|s| matches!(s.outcome, SubjectOutcome::Aborted { .. }))
      .count()
  }
}

#[derive(Default)]
struct Tally {
  pages: u32,
  posts: u64,
  media: u64,
}

// ─── Crawler ─────────────────────────────────────────────────────────────────

/// Owns one feed source (one navigation context) and crawls subjects through
/// it one at a time.
pub struct Crawler<'s, S, F, X> {
  store:     &'s S,
  source:    F,
  extractor: X,
  settings:  CrawlSettings,
}

impl<'s, S, F, X> Crawler<'s, S, F, X>
where
  S: DedupStore,
  F: FeedSource,
  X: Extractor<F::Snapshot>,
{
  pub fn new(store: &'s S, source: F, extractor: X, settings: CrawlSettings) -> Self {
    Self { store, source, extractor, settings }
  }

  /// Hand the feed source back, e.g. to close it explicitly.
  pub fn into_source(self) -> F { self.source }

  /// Crawl every registered subject once, in ID order.
  ///
  /// Source failures are contained to their subject and show up in the
  /// report; only store failures end the run early.
  pub async fn run(&mut self) -> Result<RunReport> {
    let subjects = self.store.list_subjects().await.map_err(Error::store)?;
    let mut report = RunReport::default();

    for subject in subjects {
      let span = info_span!("subject", name = %subject.name, id = subject.subject_id);
      let subject_report = self.crawl_subject(&subject).instrument(span).await?;
      report.subjects.push(subject_report);
    }

    info!(
      subjects = report.subjects.len(),
      posts = report.posts_added(),
      media = report.media_added(),
      aborted = report.aborted(),
      "run finished"
    );
    Ok(report)
  }

  /// Crawl one subject until its trial budget is spent or its source fails.
  pub async fn crawl_subject(&mut self, subject: &Subject) -> Result<SubjectReport> {
    let mut tally = Tally::default();

    let checkpoint = match (subject.checkpoint, self.settings.rescan) {
      (Checkpoint::Done, RescanMode::Skip) => {
        debug!("already fully scanned; skipping");
        return Ok(report(subject, SubjectOutcome::Skipped, &tally, Checkpoint::Done));
      }
      (Checkpoint::Done, RescanMode::Reset) => {
        if self.store.reset_checkpoint(subject.subject_id).await.map_err(Error::store)? {
          info!("checkpoint reset for a full rescan");
        }
        Checkpoint::START
      }
      (checkpoint, _) => checkpoint,
    };

    let mut scheduler = ScrollScheduler::new(self.settings.policy, checkpoint);

    if let Err(e) = self
      .source
      .open(&subject.name, &self.settings.extension_path)
      .await
    {
      return Ok(self.abort(subject, Error::feed(&subject.name, e), &tally, &scheduler));
    }
    info!(%checkpoint, "scanning");

    let mut previous_page_depth = None;

    loop {
      if !self.settings.page_delay.is_zero() {
        tokio::time::sleep(self.settings.page_delay).await;
      }

      let snapshot = match self.source.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
          return Ok(self.abort(subject, Error::feed(&subject.name, e), &tally, &scheduler));
        }
      };
      tally.pages += 1;

      let extraction = self.extractor.extract(&subject.name, &snapshot);
      if let Some(previous) = previous_page_depth
        && extraction.depth < previous
      {
        warn!(previous, depth = extraction.depth, "page depth moved backwards");
      }
      previous_page_depth = Some(extraction.depth);

      let discovered = self
        .persist(subject, &extraction.candidates, &mut tally)
        .await?;

      let new_depth = match self.source.advance(scheduler.last_depth()).await {
        Ok(depth) => depth,
        Err(e) => {
          return Ok(self.abort(subject, Error::feed(&subject.name, e), &tally, &scheduler));
        }
      };

      let step = scheduler.observe(new_depth, discovered);
      if step.regressed {
        warn!(
          depth = new_depth,
          best = scheduler.last_depth(),
          "source reported a lower depth; keeping the best seen"
        );
      }
      debug!(
        depth = new_depth,
        trials = scheduler.remaining_trials(),
        phase = ?step.phase,
        "page cycle"
      );

      if let Some(next) = step.commit {
        self.commit(subject, next, &mut scheduler).await?;
      }

      if step.is_exhausted() {
        break;
      }
    }

    info!(
      pages = tally.pages,
      posts = tally.posts,
      media = tally.media,
      checkpoint = %scheduler.checkpoint(),
      "subject exhausted"
    );
    Ok(report(subject, SubjectOutcome::Exhausted, &tally, scheduler.checkpoint()))
  }

  /// Record a page's candidates. Returns whether any post was new.
  async fn persist(
    &self,
    subject: &Subject,
    candidates: &[Candidate],
    tally: &mut Tally,
  ) -> Result<bool> {
    let mut discovered = false;

    for candidate in candidates {
      let kind = if candidate.media_keys.is_empty() {
        PostKind::Unknown
      } else {
        PostKind::Media
      };

      let post_id = match self
        .store
        .record_post(&candidate.post_key, subject.subject_id, kind)
        .await
        .map_err(Error::store)?
      {
        Insertion::Inserted(id) => id,
        // Seen earlier in this run or a previous one; its media was handled
        // then.
        Insertion::Duplicate(dup) => {
          debug!(%dup, "skipping");
          continue;
        }
      };
      discovered = true;
      tally.posts += 1;

      for media_key in &candidate.media_keys {
        match self
          .store
          .record_media(media_key, post_id, subject.subject_id)
          .await
          .map_err(Error::store)?
        {
          Insertion::Inserted(_) => tally.media += 1,
          Insertion::Duplicate(dup) => debug!(%dup, "skipping"),
        }
      }
    }

    Ok(discovered)
  }

  async fn commit(
    &self,
    subject: &Subject,
    checkpoint: Checkpoint,
    scheduler: &mut ScrollScheduler,
  ) -> Result<()> {
    match self
      .store
      .commit_checkpoint(subject.subject_id, checkpoint)
      .await
      .map_err(Error::store)?
    {
      CheckpointCommit::Committed { previous } => {
        info!(%previous, %checkpoint, "checkpoint committed");
      }
      CheckpointCommit::Rejected { current } => {
        warn!(%current, rejected = %checkpoint, "stored checkpoint is ahead; commit ignored");
        scheduler.adopt_checkpoint(current);
      }
    }
    Ok(())
  }

  fn abort(
    &self,
    subject: &Subject,
    err: Error,
    tally: &Tally,
    scheduler: &ScrollScheduler,
  ) -> SubjectReport {
    warn!(error = %err, "abandoning subject for this run");
    report(
      subject,
      SubjectOutcome::Aborted { reason: err.to_string() },
      tally,
      scheduler.checkpoint(),
    )
  }
}

fn report(
  subject: &Subject,
  outcome: SubjectOutcome,
  tally: &Tally,
  checkpoint: Checkpoint,
) -> SubjectReport {
  SubjectReport {
    name: subject.name.clone(),
    subject_id: subject.subject_id,
    outcome,
    pages: tally.pages,
    posts_added: tally.posts,
    media_added: tally.media,
    checkpoint,
  }
}
