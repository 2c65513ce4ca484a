//! Per-subject scroll scheduling: the trial budget and checkpoint policy.
//!
//! A [`ScrollScheduler`] is fed one observation per page cycle and answers
//! whether to keep scrolling and which checkpoint, if any, to persist. It
//! performs no I/O, so the whole policy is testable without a feed source.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::subject::Checkpoint;

pub const DEFAULT_MAX_TRIALS: NonZeroU32 = NonZeroU32::MIN.saturating_add(4);

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Tunables for the trial budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollPolicy {
  /// Page cycles tolerated without a budget refill before giving up. Never
  /// zero: a zero budget would exhaust, and mark done, a feed on its first
  /// page.
  pub max_trials:             NonZeroU32,
  /// Refill the budget when a cycle records at least one new post.
  pub reset_on_new_post:      bool,
  /// Refill the budget when a cycle reaches a new maximum depth.
  pub reset_on_new_depth:     bool,
  /// Start scrolling from the stored checkpoint instead of the top.
  pub resume_from_checkpoint: bool,
}

impl Default for ScrollPolicy {
  fn default() -> Self {
    Self {
      max_trials:             DEFAULT_MAX_TRIALS,
      reset_on_new_post:      true,
      reset_on_new_depth:     true,
      resume_from_checkpoint: false,
    }
  }
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
  /// Still inside territory covered by the stored checkpoint.
  Scanning,
  /// Past the stored checkpoint; commits move it forward.
  Advancing,
  /// Budget spent. Terminal for this run of this subject.
  Exhausted,
}

/// What the caller should do after one page cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
  pub phase:     ScanPhase,
  /// Checkpoint to persist before continuing.
  pub commit:    Option<Checkpoint>,
  /// The reported depth was below the best depth seen so far.
  pub regressed: bool,
}

impl Step {
  pub fn is_exhausted(&self) -> bool { self.phase == ScanPhase::Exhausted }
}

#[derive(Debug, Clone)]
pub struct ScrollScheduler {
  policy:           ScrollPolicy,
  checkpoint:       Checkpoint,
  last_depth:       u64,
  remaining_trials: u32,
  /// `last_depth` at the most recent budget refill.
  refill_depth:     u64,
  phase:            ScanPhase,
}

impl ScrollScheduler {
  /// Start scheduling a subject whose stored checkpoint is `checkpoint`.
  ///
  /// A [`Checkpoint::Done`] subject is scanned unbounded: no checkpoint is
  /// ever emitted for it.
  pub fn new(policy: ScrollPolicy, checkpoint: Checkpoint) -> Self {
    let last_depth = match checkpoint {
      Checkpoint::Depth(d) if policy.resume_from_checkpoint => d,
      _ => 0,
    };
    Self {
      policy,
      checkpoint,
      last_depth,
      remaining_trials: policy.max_trials.get(),
      refill_depth: last_depth,
      phase: ScanPhase::Scanning,
    }
  }

  pub fn policy(&self) -> &ScrollPolicy { &self.policy }

  pub fn phase(&self) -> ScanPhase { self.phase }

  /// The checkpoint as last emitted (or as loaded).
  pub fn checkpoint(&self) -> Checkpoint { self.checkpoint }

  /// Best depth observed so far; where the next advance starts from.
  pub fn last_depth(&self) -> u64 { self.last_depth }

  pub fn remaining_trials(&self) -> u32 { self.remaining_trials }

  /// Replace the tracked checkpoint with the value the store actually holds,
  /// after the store rejected a commit.
  pub fn adopt_checkpoint(&mut self, stored: Checkpoint) {
    self.checkpoint = self.checkpoint.max(stored);
  }

  /// Feed one page cycle: the depth reported after advancing, and whether
  /// the page yielded at least one post that was not already recorded.
  pub fn observe(&mut self, new_depth: u64, discovered_new_post: bool) -> Step {
    if self.phase == ScanPhase::Exhausted {
      return Step { phase: self.phase, commit: None, regressed: false };
    }

    self.remaining_trials = self.remaining_trials.saturating_sub(1);

    let mut refill = discovered_new_post && self.policy.reset_on_new_post;
    let mut commit = None;
    let regressed = new_depth < self.last_depth;

    if new_depth > self.last_depth {
      refill |= self.policy.reset_on_new_depth;

      if let Checkpoint::Depth(committed) = self.checkpoint
        && new_depth > committed
      {
        // Extraction has only been attempted up to `last_depth`; the page
        // at `new_depth` has not been read yet.
        if self.last_depth > committed {
          self.checkpoint = Checkpoint::Depth(self.last_depth);
          commit = Some(self.checkpoint);
        }
        self.phase = ScanPhase::Advancing;
      }
    }

    self.last_depth = self.last_depth.max(new_depth);

    if refill {
      self.remaining_trials = self.policy.max_trials.get();
      self.refill_depth = self.last_depth;
    }

    if self.remaining_trials == 0 {
      self.phase = ScanPhase::Exhausted;
      // No new depth across the whole final budget: the feed has ended.
      if !self.checkpoint.is_done() && self.last_depth == self.refill_depth {
        self.checkpoint = Checkpoint::Done;
        commit = Some(Checkpoint::Done);
      }
    }

    Step { phase: self.phase, commit, regressed }
  }
}
