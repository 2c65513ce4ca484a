//! The feedscan crawl engine.
//!
//! Drives a [`FeedSource`](feedscan_core::source::FeedSource) through every
//! registered subject, persists what the extractor finds into a
//! [`DedupStore`](feedscan_core::store::DedupStore), and commits per-subject
//! checkpoints so an interrupted run resumes where it stopped.

pub mod classify;
pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod feed;

pub use classify::{Upgrade, upgrade_post_kind};
pub use config::CrawlerConfig;
pub use crawl::{CrawlSettings, Crawler, RescanMode, RunReport, SubjectOutcome, SubjectReport};
pub use error::{Error, Result};
pub use extract::LinkExtractor;
pub use feed::RecordedFeed;
