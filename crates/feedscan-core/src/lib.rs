//! Core types and trait definitions for the feedscan crawler.
//!
//! This crate is deliberately free of database, browser and runtime
//! dependencies. The store backend and the crawler depend on it; it depends
//! on nothing but `chrono`, `serde` and `thiserror`.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod record;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
