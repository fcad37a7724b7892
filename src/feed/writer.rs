//! Output artifacts: the RSS cache document and its HTML page.

use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use rss::ChannelBuilder;
use tempfile::NamedTempFile;
use url::Url;

use super::{Entry, SourceConfig};
use crate::config::{CacheConfig, HtmlConfig};
use crate::datetime::format_pub_date;
use crate::template::{TemplateContext, TemplateEngine, Value};
use crate::{FeedCacheError, Result};

const PAGE_TEMPLATE: &str = "page";
const DEFAULT_PAGE_TEMPLATE: &str = include_str!("embed/page.html");

/// Shown for entries that carry neither a title nor a link.
const UNTITLED: &str = "(untitled)";

/// Destination of reconciled caches.
pub trait OutputWriter {
    /// Persist `entries` as the new cache of `source`.
    fn write(
        &self,
        source: &SourceConfig,
        entries: &[Entry],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Channel title of every cache document.
pub fn channel_title(source_url: &str) -> String {
    format!("Cached Feed from {source_url}")
}

/// Writes `<prefix><id>.xml` and `<prefix><id>.html` into the output directory.
pub struct FileWriter {
    cache: CacheConfig,
    html: HtmlConfig,
    engine: TemplateEngine,
}

impl FileWriter {
    /// Create a writer, loading the page template.
    ///
    /// Uses `html.template` when set, the built-in page otherwise.
    pub fn new(cache: CacheConfig, html: HtmlConfig) -> Result<Self> {
        let template = match &html.template {
            Some(path) => std::fs::read_to_string(path)?,
            None => DEFAULT_PAGE_TEMPLATE.to_string(),
        };

        let mut engine = TemplateEngine::new();
        engine.load(PAGE_TEMPLATE, &template)?;

        Ok(Self {
            cache,
            html,
            engine,
        })
    }

    /// Serialize entries as an RSS 2.0 document.
    pub fn render_rss(&self, source: &SourceConfig, entries: &[Entry]) -> String {
        let items: Vec<_> = entries.iter().map(|entry| entry.item().clone()).collect();

        ChannelBuilder::default()
            .title(channel_title(&source.url))
            .link(source.url.clone())
            .description(self.cache.channel_description.clone())
            .items(items)
            .build()
            .to_string()
    }

    /// Render the HTML page listing the entries.
    pub fn render_html(&self, source: &SourceConfig, entries: &[Entry]) -> Result<String> {
        let mut context = TemplateContext::new();
        context.set("title", Value::string(channel_title(&source.url)));
        context.set("link", Value::string(web_link(&source.url)));
        context.set(
            "description",
            Value::string(self.cache.channel_description.as_str()),
        );
        context.set("count", Value::from(entries.len()));
        context.set(
            "items",
            Value::list(entries.iter().map(|entry| self.entry_value(entry)).collect()),
        );

        Ok(self.engine.render(PAGE_TEMPLATE, &context)?)
    }

    fn entry_value(&self, entry: &Entry) -> Value {
        let title = entry
            .title()
            .filter(|title| !title.trim().is_empty())
            .or(entry.link().filter(|link| !link.is_empty()))
            .unwrap_or(UNTITLED);
        let date = entry
            .pub_date()
            .map(|value| format_pub_date(value, &self.html.timezone, &self.html.date_format))
            .unwrap_or_default();

        // Every key is set so item fields never fall through to the page scope.
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), Value::string(title));
        fields.insert(
            "link".to_string(),
            Value::string(entry.link().map(web_link).unwrap_or_default()),
        );
        fields.insert(
            "pub_date".to_string(),
            Value::string(entry.pub_date().unwrap_or_default()),
        );
        fields.insert("date".to_string(), Value::string(date));
        fields.insert(
            "description".to_string(),
            Value::string(entry.item().description().unwrap_or_default()),
        );
        Value::object(fields)
    }
}

/// `link` when it is an absolute http(s) URL, empty otherwise.
fn web_link(link: &str) -> &str {
    match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => link,
        _ => "",
    }
}

impl OutputWriter for FileWriter {
    async fn write(&self, source: &SourceConfig, entries: &[Entry]) -> Result<()> {
        let xml = self.render_rss(source, entries);
        let html = self.render_html(source, entries)?;

        // The XML document is the cache read by the next run, so it only
        // advances once the page is in place.
        persist(self.cache.html_path(source.source_id), html).await?;
        persist(self.cache.xml_path(source.source_id), xml).await?;
        Ok(())
    }
}

async fn persist(path: PathBuf, content: String) -> Result<()> {
    tokio::task::spawn_blocking(move || atomic_write(&path, &content))
        .await
        .map_err(|e| FeedCacheError::Write(format!("write task failed: {e}")))?
}

/// Replace `path` with `content` via a temporary file in the same directory.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path)
        .map_err(|e| FeedCacheError::Write(format!("{}: {}", path.display(), e.error)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::cache::parse_cache_document;

    fn source() -> SourceConfig {
        SourceConfig {
            source_id: 3,
            url: "https://example.com/rss?a=1&b=2".to_string(),
            file_name: "source_3.txt".to_string(),
        }
    }

    fn writer_in(dir: &Path) -> FileWriter {
        let cache = CacheConfig {
            output_dir: dir.to_string_lossy().into_owned(),
            ..CacheConfig::default()
        };
        FileWriter::new(cache, HtmlConfig::default()).unwrap()
    }

    #[test]
    fn test_render_rss_channel() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let xml = writer.render_rss(&source(), &[Entry::default().with_guid("a")]);
        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();

        assert_eq!(
            channel.title(),
            "Cached Feed from https://example.com/rss?a=1&b=2"
        );
        assert_eq!(channel.link(), "https://example.com/rss?a=1&b=2");
        assert_eq!(channel.description(), "FIFO cached RSS feed");
        assert_eq!(channel.items().len(), 1);
    }

    #[test]
    fn test_render_rss_round_trip_preserves_items() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let mut item = rss::Item::default();
        item.set_title("Episode 1".to_string());
        item.set_link("https://example.com/ep1".to_string());
        item.set_author("host@example.com".to_string());
        item.set_comments("https://example.com/ep1#comments".to_string());
        item.set_categories(vec![rss::CategoryBuilder::default()
            .name("podcast")
            .build()]);
        item.set_enclosure(
            rss::EnclosureBuilder::default()
                .url("https://example.com/ep1.mp3")
                .length("2048")
                .mime_type("audio/mpeg")
                .build(),
        );
        let entries = vec![
            Entry::new(item).with_guid("ep-1").with_pub_date("Tue, 02 Jan 2024 10:30:00 +0000"),
            Entry::default().with_link("https://example.com/plain"),
        ];

        let xml = writer.render_rss(&source(), &entries);
        let parsed = parse_cache_document(xml.as_bytes()).unwrap();

        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_render_html_lists_entries() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let entries = vec![
            Entry::default()
                .with_guid("1")
                .with_title("Tom & Jerry")
                .with_link("https://example.com/1")
                .with_pub_date("2024-01-15T10:30:00Z"),
            Entry::default().with_guid("2"),
        ];

        let html = writer.render_html(&source(), &entries).unwrap();

        assert!(html.contains("<title>Cached Feed from https://example.com/rss?a=1&amp;b=2</title>"));
        assert!(html.contains(
            r#"<li><a href="https://example.com/1">Tom &amp; Jerry</a><time>2024-01-15 10:30</time></li>"#
        ));
        assert!(html.contains("<li>(untitled)</li>"));
        assert!(html.contains("2 entries"));
    }

    #[test]
    fn test_render_html_escapes_markup() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let entries = vec![Entry::default()
            .with_title("<script>alert(1)</script>")
            .with_link("https://example.com/\"onmouseover=\"x")];

        let html = writer.render_html(&source(), &entries).unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("https://example.com/&quot;onmouseover=&quot;x"));
    }

    #[test]
    fn test_render_html_only_links_web_urls() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let entries = vec![
            Entry::default()
                .with_title("click")
                .with_link("javascript:alert(document.cookie)"),
            Entry::default()
                .with_title("data")
                .with_link("data:text/html,<script>alert(1)</script>"),
            Entry::default().with_title("relative").with_link("/posts/1"),
            Entry::default()
                .with_title("plain")
                .with_link("http://example.com/1"),
        ];

        let html = writer.render_html(&source(), &entries).unwrap();

        assert!(!html.contains("javascript:"));
        assert!(!html.contains("data:text/html"));
        assert!(html.contains("<li>click</li>"));
        assert!(html.contains("<li>data</li>"));
        assert!(html.contains("<li>relative</li>"));
        assert!(html.contains(r#"<li><a href="http://example.com/1">plain</a></li>"#));
    }

    #[test]
    fn test_web_link() {
        assert_eq!(web_link("https://example.com/a"), "https://example.com/a");
        assert_eq!(web_link("HTTP://example.com/a"), "HTTP://example.com/a");
        assert_eq!(web_link("javascript:alert(1)"), "");
        assert_eq!(web_link(" javascript:alert(1)"), "");
        assert_eq!(web_link("ftp://example.com/file"), "");
        assert_eq!(web_link("not a url"), "");
    }

    #[test]
    fn test_render_html_uses_timezone() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheConfig {
            output_dir: dir.path().to_string_lossy().into_owned(),
            ..CacheConfig::default()
        };
        let html_config = HtmlConfig {
            timezone: "Asia/Tokyo".to_string(),
            date_format: "%Y/%m/%d %H:%M".to_string(),
            ..HtmlConfig::default()
        };
        let writer = FileWriter::new(cache, html_config).unwrap();

        let entries = vec![Entry::default()
            .with_title("Dated")
            .with_pub_date("Mon, 15 Jan 2024 10:30:00 +0000")];
        let html = writer.render_html(&source(), &entries).unwrap();

        assert!(html.contains("<time>2024/01/15 19:30</time>"));
    }

    #[test]
    fn test_custom_template() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("page.hbs");
        std::fs::write(
            &template_path,
            "{{#each items}}{{@number}}. {{title}}\n{{/each}}",
        )
        .unwrap();

        let cache = CacheConfig {
            output_dir: dir.path().to_string_lossy().into_owned(),
            ..CacheConfig::default()
        };
        let html_config = HtmlConfig {
            template: Some(template_path.to_string_lossy().into_owned()),
            ..HtmlConfig::default()
        };
        let writer = FileWriter::new(cache, html_config).unwrap();

        let entries = vec![
            Entry::default().with_title("First"),
            Entry::default().with_title("Second"),
        ];
        let html = writer.render_html(&source(), &entries).unwrap();

        assert_eq!(html, "1. First\n2. Second\n");
    }

    #[test]
    fn test_custom_template_missing() {
        let html_config = HtmlConfig {
            template: Some("/nonexistent/page.hbs".to_string()),
            ..HtmlConfig::default()
        };
        let result = FileWriter::new(CacheConfig::default(), html_config);
        assert!(matches!(result, Err(FeedCacheError::Io(_))));
    }

    #[test]
    fn test_atomic_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cacheluu_1.xml");

        atomic_write(&path, "first").unwrap();
        atomic_write(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        // No temporary files are left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_atomic_write_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cacheluu_1.xml");

        assert!(atomic_write(&path, "content").is_err());
    }

    #[tokio::test]
    async fn test_write_creates_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());
        let entries = vec![Entry::default().with_guid("a").with_title("A")];

        writer.write(&source(), &entries).await.unwrap();

        let xml = std::fs::read(dir.path().join("cacheluu_3.xml")).unwrap();
        let html = std::fs::read_to_string(dir.path().join("cacheluu_3.html")).unwrap();
        assert_eq!(parse_cache_document(&xml).unwrap(), entries);
        assert!(html.contains("<li>A</li>"));
    }
}
