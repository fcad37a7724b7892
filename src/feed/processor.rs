//! Per-source update: fetch, load prior cache, reconcile, write.

use tracing::{debug, error, info, warn};

use super::cache::parse_cache_document;
use super::reconcile::{reconcile, MergePolicy};
use super::{CacheSource, Entry, FeedFetcher, OutputWriter, RemoteCache, SourceConfig};

/// Result of processing one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// New entries were merged and the artifacts rewritten.
    Updated { added: usize, total: usize },
    /// Nothing new; artifacts left untouched.
    Unchanged,
    /// The source failed; the reason has been logged.
    Failed(String),
}

/// Runs the update cycle of a single source.
pub struct SourceProcessor<F, C, W> {
    fetcher: F,
    cache: C,
    writer: W,
    max_items: usize,
    policy: MergePolicy,
}

impl<F, C, W> SourceProcessor<F, C, W>
where
    F: FeedFetcher,
    C: CacheSource,
    W: OutputWriter,
{
    pub fn new(fetcher: F, cache: C, writer: W, max_items: usize, policy: MergePolicy) -> Self {
        Self {
            fetcher,
            cache,
            writer,
            max_items,
            policy,
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Process one source. Never fails: errors are logged and reported as
    /// [`SourceOutcome::Failed`].
    pub async fn process(&self, source: &SourceConfig) -> SourceOutcome {
        let id = source.source_id;
        debug!(source = id, "Fetching {}", source.url);

        let fresh = match self.fetcher.fetch(&source.url).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(source = id, "Failed to fetch {}: {}", source.url, e);
                return SourceOutcome::Failed(e.to_string());
            }
        };

        let prior = self.load_prior(id).await;
        let reconciled = reconcile(&fresh, &prior, self.max_items, self.policy);

        if !reconciled.has_changes() {
            info!(source = id, "No new items for {}", source.url);
            return SourceOutcome::Unchanged;
        }

        if let Err(e) = self.writer.write(source, &reconciled.entries).await {
            error!(source = id, "Failed to write cache for {}: {}", source.url, e);
            return SourceOutcome::Failed(e.to_string());
        }

        info!(
            source = id,
            "Updated {} with {} new item(s), {} cached",
            source.file_name,
            reconciled.added,
            reconciled.entries.len()
        );
        SourceOutcome::Updated {
            added: reconciled.added,
            total: reconciled.entries.len(),
        }
    }

    /// Prior cache: the remote mirror when it answers, the local file
    /// otherwise. Anything unreadable counts as an empty cache.
    async fn load_prior(&self, source_id: u32) -> Vec<Entry> {
        match self.cache.fetch_remote(source_id).await {
            RemoteCache::Found(body) => parse_prior(source_id, "remote", &body),
            RemoteCache::NotFound => {
                info!(source = source_id, "No remote cache yet, starting empty");
                Vec::new()
            }
            RemoteCache::Unavailable(reason) => {
                warn!(
                    source = source_id,
                    "Remote cache unavailable ({}), using local cache", reason
                );
                self.load_local(source_id).await
            }
            RemoteCache::Disabled => self.load_local(source_id).await,
        }
    }

    async fn load_local(&self, source_id: u32) -> Vec<Entry> {
        match self.cache.read_local(source_id).await {
            Ok(Some(body)) => parse_prior(source_id, "local", &body),
            Ok(None) => {
                debug!(source = source_id, "No local cache, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(source = source_id, "Failed to read local cache: {}", e);
                Vec::new()
            }
        }
    }
}

fn parse_prior(source_id: u32, origin: &str, body: &[u8]) -> Vec<Entry> {
    match parse_cache_document(body) {
        Ok(entries) => {
            debug!(
                source = source_id,
                "Loaded {} cached item(s) from {} cache",
                entries.len(),
                origin
            );
            entries
        }
        Err(e) => {
            warn!(
                source = source_id,
                "Ignoring unreadable {} cache: {}", origin, e
            );
            Vec::new()
        }
    }
}
