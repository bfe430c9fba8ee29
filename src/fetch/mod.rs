//! HTTP retrieval of landing pages and documents.
//!
//! The [`ContentFetcher`] trait is the seam between the resolution
//! pipeline and the network: tasks fetch a landing page as text and then
//! stream the resolved document to disk through it. The production
//! implementation is [`HttpFetcher`] (reqwest); tests exercise it against
//! mock servers rather than stubbing the trait.
//!
//! Proxy settings and timeouts are applied once at client construction.
//! No request defines its own timeout; an expired timeout surfaces as
//! [`FetchError::Timeout`], never a hang.

mod error;

pub use error::FetchError;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::REFERER;
use reqwest::{Client, Proxy};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use crate::user_agent;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default read timeout in seconds. Generous because document downloads
/// share the client with landing-page fetches.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Proxy configuration: scheme (`http`/`https`) to proxy address.
pub type ProxyMap = HashMap<String, String>;

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// A fetched response body with its protocol metadata.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    /// HTTP status code of the final response.
    pub status: u16,
    /// URL the response was served from, after redirects.
    pub final_url: String,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchedContent {
    /// Returns the body decoded as UTF-8 text, lossily.
    ///
    /// Landing pages are HTML; occasional invalid bytes are replaced
    /// rather than failing the whole extraction.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network boundary used by resolution tasks.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Arc<dyn ContentFetcher>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required here.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches a URL and returns the full response body.
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedContent>;

    /// Streams a URL's response body to `dest`, returning bytes written.
    ///
    /// A partial file left by a mid-stream failure is removed.
    async fn download(&self, url: &str, referer: Option<&str>, dest: &Path) -> Result<u64>;
}

/// reqwest-backed [`ContentFetcher`].
///
/// Created once per batch and shared across tasks; connection pooling
/// lives in the underlying client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the given proxy map and default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Proxy`] for an unusable proxy address and
    /// [`FetchError::Client`] if client construction fails.
    pub fn new(proxies: &ProxyMap) -> Result<Self> {
        Self::with_timeouts(
            proxies,
            DEFAULT_CONNECT_TIMEOUT_SECS,
            DEFAULT_READ_TIMEOUT_SECS,
        )
    }

    /// Creates a fetcher with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Proxy`] for an unusable proxy address and
    /// [`FetchError::Client`] if client construction fails.
    pub fn with_timeouts(
        proxies: &ProxyMap,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent());

        for (scheme, address) in proxies {
            let proxy = match scheme.as_str() {
                "http" => Proxy::http(address),
                "https" => Proxy::https(address),
                other => {
                    return Err(FetchError::proxy(other, address.as_str()));
                }
            };
            builder = builder
                .proxy(proxy.map_err(|_| FetchError::proxy(scheme.as_str(), address.as_str()))?);
        }

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    async fn send_get(&self, url: &str, referer: Option<&str>) -> Result<reqwest::Response> {
        // Validate up front so malformed URLs fail as InvalidUrl rather
        // than an opaque transport error.
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedContent> {
        let response = self.send_get(url, referer).await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::timeout(url)
                } else {
                    FetchError::network(url, e)
                }
            })?
            .to_vec();

        debug!(status, bytes = body.len(), "fetched content");

        Ok(FetchedContent {
            status,
            final_url,
            body,
        })
    }

    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    async fn download(&self, url: &str, referer: Option<&str>, dest: &Path) -> Result<u64> {
        let response = self.send_get(url, referer).await?;

        let file = File::create(dest)
            .await
            .map_err(|e| FetchError::io(dest, e))?;

        let stream_result = stream_to_file(file, response, url, dest).await;

        if stream_result.is_err() {
            debug!(path = %dest.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(dest).await;
        }

        stream_result
    }
}

/// Streams a response body to file, returning bytes written.
///
/// Extracted so the caller can clean up the partial file on error.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    dest: &Path,
) -> Result<u64> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(dest, e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk
    writer.flush().await.map_err(|e| FetchError::io(dest, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_status_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&ProxyMap::new()).unwrap();
        let url = format!("{}/landing", mock_server.uri());

        let content = fetcher.fetch(&url, None).await.unwrap();
        assert_eq!(content.status, 200);
        assert_eq!(content.text(), "<html>hi</html>");
    }

    #[tokio::test]
    async fn test_fetch_sends_referer_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/landing"))
            .and(header("Referer", "https://mirror.test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&ProxyMap::new()).unwrap();
        let url = format!("{}/landing", mock_server.uri());

        let content = fetcher.fetch(&url, Some("https://mirror.test")).await;
        assert!(content.is_ok(), "Expected Ok, got: {content:?}");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&ProxyMap::new()).unwrap();
        let url = format!("{}/missing", mock_server.uri());

        let result = fetcher.fetch(&url, None).await;
        match result {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_invalid_url_is_error() {
        let fetcher = HttpFetcher::new(&ProxyMap::new()).unwrap();
        let result = tokio_test::block_on(fetcher.fetch("not-a-valid-url", None));
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_timeout_surfaces_as_timeout_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::with_timeouts(&ProxyMap::new(), 10, 1).unwrap();
        let url = format!("{}/slow", mock_server.uri());

        let result = fetcher.fetch(&url, None).await;
        assert!(
            matches!(result, Err(FetchError::Timeout { .. }) | Err(FetchError::Network { .. })),
            "Expected timeout or network error, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_download_streams_body_to_dest() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/paper.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 content"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&ProxyMap::new()).unwrap();
        let url = format!("{}/paper.pdf", mock_server.uri());
        let dest = temp_dir.path().join("paper.pdf");

        let bytes = fetcher.download(&url, None, &dest).await.unwrap();
        assert_eq!(bytes, 16);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.4 content");
    }

    #[tokio::test]
    async fn test_download_http_error_leaves_no_file() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/paper.pdf"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&ProxyMap::new()).unwrap();
        let url = format!("{}/paper.pdf", mock_server.uri());
        let dest = temp_dir.path().join("paper.pdf");

        let result = fetcher.download(&url, None, &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists(), "No file should exist after HTTP error");
    }

    #[tokio::test]
    async fn test_download_mid_stream_failure_cleans_partial_file() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"data".to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::with_timeouts(&ProxyMap::new(), 10, 1).unwrap();
        let url = format!("{}/slow.pdf", mock_server.uri());
        let dest = temp_dir.path().join("slow.pdf");

        let result = fetcher.download(&url, None, &dest).await;
        assert!(result.is_err(), "expected timeout or network error");
        assert!(
            !dest.exists(),
            "Partial file must be cleaned up after stream error"
        );
    }

    #[test]
    fn test_invalid_proxy_address_rejected() {
        let mut proxies = ProxyMap::new();
        proxies.insert("http".to_string(), "\0".to_string());

        let result = HttpFetcher::new(&proxies);
        assert!(matches!(result, Err(FetchError::Proxy { .. })));
    }

    #[test]
    fn test_unknown_proxy_scheme_rejected() {
        let mut proxies = ProxyMap::new();
        proxies.insert("socks9".to_string(), "localhost:1080".to_string());

        let result = HttpFetcher::new(&proxies);
        assert!(matches!(result, Err(FetchError::Proxy { .. })));
    }
}
