//! Test helpers for integration tests.
//!
//! Provides a minimal HTTP server serving canned responses, and helpers
//! for building feed documents and configurations.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use feedcache::Config;

type Routes = Arc<Mutex<HashMap<String, (u16, String)>>>;

/// HTTP server answering GET requests from a route table.
///
/// Unknown paths answer 404.
pub struct TestHttpServer {
    addr: SocketAddr,
    routes: Routes,
    handle: JoinHandle<()>,
}

impl TestHttpServer {
    /// Bind to an ephemeral port on 127.0.0.1 and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

        let served = Arc::clone(&routes);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&served);
                tokio::spawn(async move {
                    let _ = respond(stream, routes).await;
                });
            }
        });

        Self {
            addr,
            routes,
            handle,
        }
    }

    /// Full URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Serve `body` with `status` at `path`.
    pub fn route(&self, path: &str, status: u16, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.into()));
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(mut stream: TcpStream, routes: Routes) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let request = String::from_utf8_lossy(&request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let (status, body) = routes
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or((404, "not found".to_string()));

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// RSS 2.0 document with one item per `(guid, title)` pair.
pub fn rss_feed(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(guid, title)| {
            format!(
                "<item><title>{title}</title><link>https://example.com/{guid}</link><guid isPermaLink=\"false\">{guid}</guid></item>"
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test Feed</title><link>https://example.com</link><description>Test</description>{items}</channel></rss>"#
    )
}

/// Configuration rooted in `root`: sources in `root/url`, output in
/// `root/out`, private hosts allowed for the local test server.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.sources.dir = root.join("url").to_string_lossy().into_owned();
    config.cache.output_dir = root.join("out").to_string_lossy().into_owned();
    config.fetch.allow_private_hosts = true;
    config.fetch.total_timeout_secs = 5;
    config
}

/// Write a source file containing `url` under `root/url`.
pub fn write_source(root: &Path, file_name: &str, url: &str) {
    let dir = root.join("url");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file_name), format!("{url}\n")).unwrap();
}

/// Guids of a cache document, in order.
pub fn cached_guids(xml: &str) -> Vec<String> {
    feedcache::feed::parse_cache_document(xml.as_bytes())
        .unwrap()
        .iter()
        .filter_map(|entry| entry.identity().map(str::to_string))
        .collect()
}
