//! Feed caching for feedcache.
//!
//! Each configured source is fetched, merged into its bounded cache and
//! republished as an RSS document plus an HTML page:
//!
//! - [`fetcher`]: live feed retrieval and parsing
//! - [`cache`]: prior cache from the remote mirror or the local file
//! - [`reconcile`]: deduplicating merge with truncation
//! - [`writer`]: RSS/HTML rendering and atomic file replacement
//! - [`processor`]: the per-source update cycle
//! - [`runner`]: source discovery and batch execution

pub mod cache;
pub mod entry;
pub mod fetcher;
pub mod processor;
pub mod reconcile;
pub mod runner;
pub mod writer;

#[cfg(test)]
mod testing;

pub use cache::{parse_cache_document, CacheSource, CacheStore, RemoteCache};
pub use entry::Entry;
pub use fetcher::{parse_feed, validate_url, FeedFetcher, HttpFetcher};
pub use processor::{SourceOutcome, SourceProcessor};
pub use reconcile::{reconcile, MergePolicy, Reconciled};
pub use runner::{
    discover_sources, run, source_id_from_file_name, Discovery, RunSummary, Runner, SourceConfig,
};
pub use writer::{atomic_write, FileWriter, OutputWriter};
