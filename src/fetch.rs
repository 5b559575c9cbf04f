//! HTTP fetching for pages, robots.txt, and sitemap documents.

use crate::types::{HttpConfig, PageError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, trace};

const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A fetched response body with just enough metadata for the pipeline.
#[derive(Debug)]
pub struct RawResponse {
    pub ok: bool,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// HTTP fetcher shared by every phase of a scan.
///
/// All calls carry the per-request timeout from [`HttpConfig`]; a timeout
/// or transport failure surfaces as an error on that one call only.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Create a new fetcher with redirect-follow and a hard per-request
    /// deadline.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .http1_only()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }

    /// Fetch a resource as raw bytes with the given `Accept` header.
    ///
    /// Used for robots.txt and sitemap documents, where the caller decides
    /// what a non-2xx status means (always: skip, never abort).
    pub async fn fetch_raw(&self, url: &str, accept: &str) -> Result<RawResponse> {
        trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await?;

        let status = response.status().as_u16();
        let ok = response.status().is_success();
        let content_type = header_value(&response, CONTENT_TYPE);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            ok,
            status,
            content_type,
            body,
        })
    }

    /// Fetch one page and return its HTML, or the [`PageError`] describing
    /// why it does not count as scanned-ok.
    ///
    /// Outcomes:
    /// - non-2xx status: error with the numeric status
    /// - content-type present and not HTML/XHTML: skipped
    /// - timeout / transport failure: error with `status: None`
    pub async fn fetch_page(&self, url: &str) -> std::result::Result<String, PageError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, PAGE_ACCEPT)
            .send()
            .await
            .map_err(|e| PageError {
                url: url.to_string(),
                status: None,
                error: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(PageError {
                url: url.to_string(),
                status: Some(status),
                error: "Non-2xx response".to_string(),
            });
        }

        let content_type = header_value(&response, CONTENT_TYPE);
        if let Some(ref ct) = content_type {
            if !is_html_content_type(ct) {
                return Err(PageError {
                    url: url.to_string(),
                    status: Some(status),
                    error: format!("Skipped non-HTML content-type: {}", ct),
                });
            }
        }

        let html = response.text().await.map_err(|e| PageError {
            url: url.to_string(),
            status: None,
            error: e.to_string(),
        })?;

        debug!("Fetched page: {} ({} bytes)", url, html.len());
        Ok(html)
    }
}

fn header_value(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// True for content types the extractor can parse as HTML.
pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}
