//! Live feed fetching with security measures.
//!
//! This module fetches a source feed over HTTP and parses it into entries.
//! RSS 2.0 documents are read with the `rss` crate so that every item field
//! is preserved; Atom and JSON Feed documents fall back to `feed-rs` and are
//! mapped onto RSS items.

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use reqwest::{Client, Response};
use rss::{Channel, GuidBuilder, Item};

use super::Entry;
use crate::config::FetchConfig;
use crate::datetime::to_rfc2822;
use crate::{FeedCacheError, Result};

/// Source of fresh feed entries.
pub trait FeedFetcher {
    /// Fetch and parse the feed at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<Entry>>> + Send;
}

/// Build the HTTP client shared by feed and mirror requests.
pub(crate) fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.read_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| FeedCacheError::Fetch(format!("failed to create HTTP client: {e}")))
}

/// Read a response body, enforcing `max_size` on both the declared
/// `Content-Length` and the actual body.
pub(crate) async fn read_body(
    response: Response,
    max_size: u64,
) -> std::result::Result<Vec<u8>, String> {
    if let Some(content_length) = response.content_length() {
        if content_length > max_size {
            return Err(format!(
                "feed too large: {content_length} bytes (max {max_size} bytes)"
            ));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("failed to read response: {e}"))?;

    if bytes.len() as u64 > max_size {
        return Err(format!(
            "feed too large: {} bytes (max {max_size} bytes)",
            bytes.len()
        ));
    }

    Ok(bytes.to_vec())
}

/// HTTP feed fetcher.
pub struct HttpFetcher {
    client: Client,
    max_feed_size: u64,
    allow_private_hosts: bool,
}

impl HttpFetcher {
    /// Create a fetcher from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            max_feed_size: config.max_feed_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }
}

impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>> {
        validate_url(url, self.allow_private_hosts)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedCacheError::Fetch(format!("failed to fetch feed: {e}")))?;

        if !response.status().is_success() {
            return Err(FeedCacheError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let bytes = read_body(response, self.max_feed_size)
            .await
            .map_err(FeedCacheError::Fetch)?;

        parse_feed(&bytes)
    }
}

/// Validate a feed URL.
///
/// The URL must use http or https. Unless `allow_private_hosts` is set,
/// loopback, private and reserved hosts are rejected as well.
pub fn validate_url(url: &str, allow_private_hosts: bool) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedCacheError::Fetch(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedCacheError::Fetch(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FeedCacheError::Fetch("URL has no host".to_string()))?;

    if allow_private_hosts {
        return Ok(());
    }

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FeedCacheError::Fetch(format!("forbidden host: {domain}")));
            }
            return Ok(());
        }
        url::Host::Ipv4(ipv4) => IpAddr::V4(ipv4),
        url::Host::Ipv6(ipv6) => IpAddr::V6(ipv6),
    };

    if is_private_ip(&ip) {
        return Err(FeedCacheError::Fetch(format!(
            "private IP address not allowed: {ip}"
        )));
    }

    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: [&str; 7] = [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Documentation: 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
                || matches!(octets, [192, 0, 2, _] | [198, 51, 100, _] | [203, 0, 113, _])
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local fc00::/7, link-local fe80::/10
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

/// Parse a feed document into entries.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Entry>> {
    if let Ok(channel) = Channel::read_from(bytes) {
        return Ok(channel.into_items().into_iter().map(Entry::new).collect());
    }

    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| FeedCacheError::Fetch(format!("failed to parse feed: {e}")))?;

    Ok(feed.entries.into_iter().map(entry_from_feed_rs).collect())
}

fn entry_from_feed_rs(entry: feed_rs::model::Entry) -> Entry {
    let mut item = Item::default();

    if !entry.id.is_empty() {
        item.set_guid(
            GuidBuilder::default()
                .value(entry.id)
                .permalink(false)
                .build(),
        );
    }
    item.set_title(entry.title.map(|t| t.content));
    item.set_link(entry.links.into_iter().next().map(|l| l.href));
    item.set_pub_date(entry.published.or(entry.updated).map(|dt| to_rfc2822(&dt)));
    item.set_description(
        entry
            .summary
            .map(|t| t.content)
            .or_else(|| entry.content.and_then(|c| c.body)),
    );
    item.set_author(entry.authors.into_iter().next().map(|a| a.name));

    Entry::new(item)
}
