//! feedcache - FIFO RSS feed archiver
//!
//! Pulls remote RSS feeds, merges newly seen entries into a bounded cache
//! and publishes each cache as an RSS document and an HTML page.

pub mod config;
pub mod datetime;
pub mod error;
pub mod feed;
pub mod logging;
pub mod template;

pub use config::Config;
pub use error::{FeedCacheError, Result};
pub use feed::{reconcile, Entry, MergePolicy, Reconciled, RunSummary, SourceConfig, SourceOutcome};
