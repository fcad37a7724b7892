//! Prior cache sources: a remote mirror of published caches and the local
//! cache file.

use std::future::Future;
use std::io::ErrorKind;

use reqwest::{Client, StatusCode};
use rss::Channel;

use super::fetcher::{build_client, read_body, validate_url};
use super::Entry;
use crate::config::{CacheConfig, FetchConfig};
use crate::{FeedCacheError, Result};

/// Outcome of asking the remote mirror for a cache document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCache {
    /// The mirror returned the document body, undecoded.
    Found(Vec<u8>),
    /// The mirror has no cache for this source yet.
    NotFound,
    /// The mirror could not be reached or answered with an error status.
    Unavailable(String),
    /// No mirror is configured.
    Disabled,
}

/// Where the prior state of a cache is read from.
pub trait CacheSource {
    /// Ask the remote mirror for the cache of `source_id`.
    fn fetch_remote(&self, source_id: u32) -> impl Future<Output = RemoteCache> + Send;

    /// Read the raw local cache document of `source_id`. `Ok(None)` when
    /// no cache has been written yet.
    fn read_local(&self, source_id: u32) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
}

/// Parse a cache document written by a previous run. The character
/// encoding is taken from the XML declaration.
pub fn parse_cache_document(body: &[u8]) -> Result<Vec<Entry>> {
    let channel = Channel::read_from(body)
        .map_err(|e| FeedCacheError::CacheParse(e.to_string()))?;
    Ok(channel.into_items().into_iter().map(Entry::new).collect())
}

/// Cache source backed by the configured mirror and the output directory.
pub struct CacheStore {
    client: Client,
    cache: CacheConfig,
    max_size: u64,
    allow_private_hosts: bool,
}

impl CacheStore {
    pub fn new(cache: CacheConfig, fetch: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(fetch)?,
            cache,
            max_size: fetch.max_feed_size_bytes,
            allow_private_hosts: fetch.allow_private_hosts,
        })
    }

    async fn request_mirror(&self, url: &str) -> RemoteCache {
        if let Err(e) = validate_url(url, self.allow_private_hosts) {
            return RemoteCache::Unavailable(e.to_string());
        }

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return RemoteCache::Unavailable(format!("request failed: {e}")),
        };

        match response.status() {
            StatusCode::OK => match read_body(response, self.max_size).await {
                Ok(bytes) => RemoteCache::Found(bytes),
                Err(e) => RemoteCache::Unavailable(e),
            },
            StatusCode::NOT_FOUND => RemoteCache::NotFound,
            status => RemoteCache::Unavailable(format!("HTTP error: {status}")),
        }
    }
}

impl CacheSource for CacheStore {
    async fn fetch_remote(&self, source_id: u32) -> RemoteCache {
        match self.cache.mirror_url_for(source_id) {
            Some(url) => self.request_mirror(&url).await,
            None => RemoteCache::Disabled,
        }
    }

    async fn read_local(&self, source_id: u32) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.cache.xml_path(source_id)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
