//! In-memory collaborators for processor and runner tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{CacheSource, Entry, FeedFetcher, OutputWriter, RemoteCache, SourceConfig};
use crate::{FeedCacheError, Result};

pub fn entry(id: &str) -> Entry {
    Entry::default().with_guid(id).with_title(id)
}

pub fn source(source_id: u32, url: &str) -> SourceConfig {
    SourceConfig {
        source_id,
        url: url.to_string(),
        file_name: format!("source_{source_id}.txt"),
    }
}

/// Serves canned entries per URL. Unknown URLs fail.
#[derive(Default)]
pub struct FakeFetcher {
    feeds: HashMap<String, Vec<Entry>>,
}

impl FakeFetcher {
    pub fn with_feed(mut self, url: &str, entries: Vec<Entry>) -> Self {
        self.feeds.insert(url.to_string(), entries);
        self
    }
}

impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| FeedCacheError::Fetch(format!("HTTP error: 503 for {url}")))
    }
}

/// Local cache file states.
#[derive(Clone)]
pub enum LocalCache {
    Missing,
    Content(Vec<u8>),
    Unreadable,
}

/// Prior cache with a fixed remote answer and local file, counting local reads.
pub struct FakeCache {
    remote: RemoteCache,
    local: LocalCache,
    local_reads: AtomicUsize,
}

impl FakeCache {
    pub fn new(remote: RemoteCache, local: LocalCache) -> Self {
        Self {
            remote,
            local,
            local_reads: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(RemoteCache::Disabled, LocalCache::Missing)
    }

    pub fn local_reads(&self) -> usize {
        self.local_reads.load(Ordering::SeqCst)
    }
}

impl CacheSource for FakeCache {
    async fn fetch_remote(&self, _source_id: u32) -> RemoteCache {
        self.remote.clone()
    }

    async fn read_local(&self, _source_id: u32) -> Result<Option<Vec<u8>>> {
        self.local_reads.fetch_add(1, Ordering::SeqCst);
        match &self.local {
            LocalCache::Missing => Ok(None),
            LocalCache::Content(body) => Ok(Some(body.clone())),
            LocalCache::Unreadable => Err(FeedCacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            ))),
        }
    }
}

/// Records every write; optionally fails them.
#[derive(Default)]
pub struct RecordingWriter {
    writes: Mutex<Vec<(u32, Vec<Entry>)>>,
    fail: bool,
}

impl RecordingWriter {
    pub fn failing() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn writes(&self) -> Vec<(u32, Vec<Entry>)> {
        self.writes.lock().unwrap().clone()
    }
}

impl OutputWriter for RecordingWriter {
    async fn write(&self, source: &SourceConfig, entries: &[Entry]) -> Result<()> {
        if self.fail {
            return Err(FeedCacheError::Write("disk full".to_string()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((source.source_id, entries.to_vec()));
        Ok(())
    }
}

/// Render entries as a cache document.
pub fn cache_document(entries: &[Entry]) -> Vec<u8> {
    let items: Vec<_> = entries.iter().map(|entry| entry.item().clone()).collect();
    rss::ChannelBuilder::default()
        .title("Cached Feed from https://example.com/rss")
        .link("https://example.com/rss")
        .description("FIFO cached RSS feed")
        .items(items)
        .build()
        .to_string()
        .into_bytes()
}
