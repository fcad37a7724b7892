//! Configuration module for feedcache.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::feed::MergePolicy;
use crate::{FeedCacheError, Result};

/// Placeholder replaced by the source id in `cache.mirror_url`.
pub const SOURCE_ID_PLACEHOLDER: &str = "{id}";

/// Source discovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Directory holding one URL file per source.
    #[serde(default = "default_sources_dir")]
    pub dir: String,
    /// File name prefix of source files.
    #[serde(default = "default_sources_prefix")]
    pub prefix: String,
    /// File extension of source files (without the dot).
    #[serde(default = "default_sources_extension")]
    pub extension: String,
}

fn default_sources_dir() -> String {
    "url".to_string()
}

fn default_sources_prefix() -> String {
    "source_".to_string()
}

fn default_sources_extension() -> String {
    "txt".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dir: default_sources_dir(),
            prefix: default_sources_prefix(),
            extension: default_sources_extension(),
        }
    }
}

/// Cache and output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory the RSS and HTML artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// File name prefix of the artifacts (`<prefix><id>.xml`).
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Maximum number of entries kept per cache.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Ordering applied when new entries are merged.
    #[serde(default)]
    pub merge_policy: MergePolicy,
    /// Remote mirror of the published caches, e.g.
    /// `https://example.github.io/feeds/cacheluu_{id}.xml`.
    #[serde(default)]
    pub mirror_url: Option<String>,
    /// Channel description written into every cache document.
    #[serde(default = "default_channel_description")]
    pub channel_description: String,
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_file_prefix() -> String {
    "cacheluu_".to_string()
}

fn default_max_items() -> usize {
    100
}

fn default_channel_description() -> String {
    "FIFO cached RSS feed".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            max_items: default_max_items(),
            merge_policy: MergePolicy::default(),
            mirror_url: None,
            channel_description: default_channel_description(),
        }
    }
}

impl CacheConfig {
    /// Path of the RSS document for a source.
    pub fn xml_path(&self, source_id: u32) -> PathBuf {
        Path::new(&self.output_dir).join(format!("{}{}.xml", self.file_prefix, source_id))
    }

    /// Path of the HTML page for a source.
    pub fn html_path(&self, source_id: u32) -> PathBuf {
        Path::new(&self.output_dir).join(format!("{}{}.html", self.file_prefix, source_id))
    }

    /// Mirror URL for a source, if a mirror is configured.
    pub fn mirror_url_for(&self, source_id: u32) -> Option<String> {
        self.mirror_url
            .as_ref()
            .map(|url| url.replace(SOURCE_ID_PLACEHOLDER, &source_id.to_string()))
    }
}

/// HTTP fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allow loopback and private network hosts.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    format!("feedcache/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
            allow_private_hosts: false,
        }
    }
}

/// Batch execution configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Process sources concurrently.
    #[serde(default)]
    pub parallel: bool,
    /// Maximum sources in flight when running in parallel.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// HTML page configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HtmlConfig {
    /// Path to a custom page template. The built-in template is used if unset.
    #[serde(default)]
    pub template: Option<String>,
    /// Timezone for displaying dates (e.g., "Asia/Tokyo", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// strftime format for displayed dates.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            template: None,
            timezone: default_timezone(),
            date_format: default_date_format(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Source discovery.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Cache and output.
    #[serde(default)]
    pub cache: CacheConfig,
    /// HTTP fetching.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Batch execution.
    #[serde(default)]
    pub run: RunConfig,
    /// HTML page.
    #[serde(default)]
    pub html: HtmlConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedCacheError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedCacheError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDCACHE_MIRROR_URL`: Override the remote mirror URL
    /// - `FEEDCACHE_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(mirror_url) = std::env::var("FEEDCACHE_MIRROR_URL") {
            if !mirror_url.is_empty() {
                self.cache.mirror_url = Some(mirror_url);
            }
        }
        if let Ok(level) = std::env::var("FEEDCACHE_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_items == 0 {
            return Err(FeedCacheError::Validation(
                "cache.max_items must be at least 1".to_string(),
            ));
        }
        if self.run.max_concurrency == 0 {
            return Err(FeedCacheError::Validation(
                "run.max_concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(mirror_url) = &self.cache.mirror_url {
            if !mirror_url.contains(SOURCE_ID_PLACEHOLDER) {
                return Err(FeedCacheError::Validation(format!(
                    "cache.mirror_url must contain {SOURCE_ID_PLACEHOLDER}: {mirror_url}"
                )));
            }
        }
        if self.html.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(FeedCacheError::Validation(format!(
                "unknown timezone: {}",
                self.html.timezone
            )));
        }
        Ok(())
    }
}
