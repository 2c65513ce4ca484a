//! `feedscan`: resumable feed crawler.
//!
//! # Usage
//!
//! ```text
//! feedscan add alice bob
//! feedscan run --subjects subjects.txt --feeds ./feeds
//! feedscan run --refresh --json
//! feedscan pending --limit 50
//! feedscan set-kind 42 non_media
//! feedscan reset alice
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use feedscan_core::{record::PostKind, store::DedupStore};
use feedscan_crawler::{
  CrawlSettings, Crawler, CrawlerConfig, LinkExtractor, RecordedFeed, RescanMode,
  SubjectOutcome, Upgrade, config::load_subject_list, upgrade_post_kind,
};
use feedscan_store_sqlite::SqliteStore;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Resumable feed crawler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "feedscan.toml")]
  config: PathBuf,

  /// Override the store path from the configuration.
  #[arg(long, global = true, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Crawl every registered subject once.
  Run {
    /// Register the subjects listed in FILE (one per line) before crawling.
    #[arg(long, value_name = "FILE")]
    subjects: Option<PathBuf>,

    /// Override the recorded-feed directory from the configuration.
    #[arg(long, value_name = "DIR")]
    feeds: Option<PathBuf>,

    /// Reset fully scanned subjects and scan them again from the top.
    #[arg(long, conflicts_with = "refresh")]
    rescan: bool,

    /// Scan fully scanned subjects for new posts, keeping their checkpoint.
    #[arg(long)]
    refresh: bool,

    /// Print the run report as JSON instead of one line per subject.
    #[arg(long)]
    json: bool,
  },

  /// Register subjects by name.
  Add { names: Vec<String> },

  /// List registered subjects with their checkpoints.
  Subjects,

  /// List posts whose kind is still unknown.
  Pending {
    #[arg(long, default_value_t = 20)]
    limit: usize,
  },

  /// Classify a post (`media` or `non_media`).
  SetKind { post_id: i64, kind: PostKind },

  /// Reset a fully scanned subject's checkpoint to the top of its feed.
  Reset { name: String },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = CrawlerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
  if let Some(path) = cli.store {
    cfg.store_path = path;
  }

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {}", cfg.store_path.display()))?;

  match cli.command {
    Command::Run { subjects, feeds, rescan, refresh, json } => {
      if let Some(path) = subjects {
        let names = load_subject_list(&path)
          .await
          .with_context(|| format!("reading subject list {}", path.display()))?;
        register(&store, &names).await?;
      }
      if let Some(dir) = feeds {
        cfg.feed_dir = dir;
      }
      let rescan = match (rescan, refresh) {
        (true, _) => RescanMode::Reset,
        (_, true) => RescanMode::Refresh,
        _ => RescanMode::Skip,
      };
      run(&store, &cfg, rescan, json).await
    }
    Command::Add { names } => register(&store, &names).await,
    Command::Subjects => {
      for subject in store.list_subjects().await? {
        println!("{}\t{}\t{}", subject.subject_id, subject.name, subject.checkpoint);
      }
      Ok(())
    }
    Command::Pending { limit } => {
      for post in store.pending_posts(limit).await? {
        println!("{}\t{}\t{}", post.post_id, post.subject_id, post.natural_key);
      }
      Ok(())
    }
    Command::SetKind { post_id, kind } => {
      match upgrade_post_kind(&store, post_id, kind).await? {
        Upgrade::Changed { from } => println!("post {post_id}: {from} -> {kind}"),
        Upgrade::Unchanged => println!("post {post_id} is already {kind}"),
      }
      Ok(())
    }
    Command::Reset { name } => {
      let Some(subject) = store.find_subject(&name).await? else {
        bail!("no subject named {name:?}");
      };
      if store.reset_checkpoint(subject.subject_id).await? {
        println!("{name}: reset to {}", feedscan_core::subject::Checkpoint::START);
      } else {
        println!("{name}: not fully scanned, left at {}", subject.checkpoint);
      }
      Ok(())
    }
  }
}

async fn run(
  store: &SqliteStore,
  cfg: &CrawlerConfig,
  rescan: RescanMode,
  json: bool,
) -> anyhow::Result<()> {
  let source = RecordedFeed::new(&cfg.feed_dir).with_step(cfg.scroll_step);
  let settings = CrawlSettings {
    policy: cfg.scroll,
    extension_path: cfg.extension_path.clone(),
    page_delay: cfg.page_delay(),
    rescan,
  };

  let report = Crawler::new(store, source, LinkExtractor, settings)
    .run()
    .await
    .context("crawl stopped")?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    for subject in &report.subjects {
      let outcome = match &subject.outcome {
        SubjectOutcome::Exhausted => "exhausted".to_owned(),
        SubjectOutcome::Skipped => "skipped".to_owned(),
        SubjectOutcome::Aborted { reason } => format!("aborted: {reason}"),
      };
      println!(
        "{}\t+{} posts\t+{} media\tcheckpoint {}\t{outcome}",
        subject.name, subject.posts_added, subject.media_added, subject.checkpoint
      );
    }
  }

  let counts = store.counts().await?;
  info!(
    subjects = counts.subjects,
    posts = counts.posts,
    media = counts.media,
    "store totals"
  );
  Ok(())
}

/// Create any subjects in `names` that are not yet registered.
async fn register(store: &SqliteStore, names: &[String]) -> anyhow::Result<()> {
  for name in names {
    let insertion = store.create_subject(name).await?;
    match insertion.id() {
      Some(id) => info!(id, %name, "subject registered"),
      None => info!(%name, "subject already registered"),
    }
  }
  Ok(())
}
