//! Main scanner orchestrating the scan pipeline.
//!
//! Phases run in order: sitemap discovery, sitemap loading, scope
//! filtering/union, concurrent page fetching with asset detection,
//! vulnerability reconciliation, report assembly. No failure in any
//! single page, sitemap, or OSV batch aborts the scan; a request that
//! passes validation always produces a report.

use crate::aggregate::Aggregator;
use crate::config::{is_valid_target, ScanRequest};
use crate::console::ConsoleOutput;
use crate::detect::detect_library;
use crate::discovery::{discover_sitemap_urls, load_sitemap_pages};
use crate::extract::{extract_assets, resolve_asset_url};
use crate::fetch::PageFetcher;
use crate::osv::OsvClient;
use crate::scope;
use crate::report;
use crate::types::{
    DetectedLibrary, HttpConfig, LibscanError, PageError, Result, ScanOutcome,
};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Append-only human-readable transcript of a scan's key decisions.
#[derive(Debug, Default)]
pub struct ScanLog {
    buf: String,
}

impl ScanLog {
    pub fn info(&mut self, message: impl AsRef<str>) {
        let _ = writeln!(self.buf, "[*] {}", message.as_ref());
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        let _ = writeln!(self.buf, "[!] {}", message.as_ref());
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Main scanner. One instance can run any number of scans; all scan
/// state lives inside a single [`Scanner::scan`] invocation.
pub struct Scanner {
    user_agent: String,
    console: ConsoleOutput,
    osv_api_url: Option<String>,
}

impl Scanner {
    pub fn new(console: ConsoleOutput) -> Self {
        Self {
            user_agent: HttpConfig::default().user_agent,
            console,
            osv_api_url: None,
        }
    }

    /// Override the outgoing User-Agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the OSV endpoint (alternate deployments, tests).
    pub fn with_osv_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.osv_api_url = Some(api_url.into());
        self
    }

    /// Run one scan.
    ///
    /// Returns `Err` only for request validation or client-setup failures
    /// before any crawling begins. Every later degradation - unreachable
    /// sitemaps, failed pages, OSV outages - is represented in-band in
    /// the returned report.
    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanOutcome> {
        let start_time = Instant::now();
        let base = normalize_base_url(&request.base_url)?;
        let request = request.clamped();

        // The URL type guarantees http/https origins serialize cleanly.
        let origin = Url::parse(&base.origin().ascii_serialization())?;

        let http_config = HttpConfig {
            timeout_ms: request.request_timeout_ms,
            user_agent: self.user_agent.clone(),
        };
        let fetcher = PageFetcher::new(&http_config)?;

        let mut log = ScanLog::default();
        self.console.print_scan_start(base.as_str());

        log.info(format!("Base: {}", origin.as_str().trim_end_matches('/')));
        log.info(format!(
            "Options: maxPages={}, concurrency={}, timeoutMs={}, maxSitemaps={}, osv={}",
            request.max_pages,
            request.concurrency,
            request.request_timeout_ms,
            request.max_sitemaps,
            request.check_vulnerabilities
        ));

        // Caller-supplied seed pages, scope-filtered.
        let seed_pages = scope::normalize_seed_urls(&request.urls, &origin);
        if !request.urls.is_empty() {
            log.info(format!("URL list provided: {}", request.urls.len()));
            log.info(format!("URL list after filtering: {}", seed_pages.len()));
        }

        // Sitemap discovery and expansion.
        self.console.print_progress("Discovering sitemaps...");
        let candidates = discover_sitemap_urls(&fetcher, &origin).await;
        log.info(format!("Sitemap candidates: {}", candidates.len()));

        let loaded =
            load_sitemap_pages(&fetcher, &origin, &candidates, request.max_sitemaps).await;
        log.info(format!("Sitemaps fetched: {}", loaded.sitemaps_visited));
        log.info(format!(
            "Pages discovered (sitemap): {}",
            loaded.page_urls.len()
        ));

        // Union seeds and sitemap pages; fall back to the base URL alone.
        let combined = scope::union_pages(&seed_pages, &loaded.page_urls);
        let discovered_pages = if combined.is_empty() {
            log.warn(
                "No pages discovered from provided URLs or sitemap. \
                 Falling back to scanning base URL only.",
            );
            vec![base.to_string()]
        } else {
            combined
        };
        let discovered_count = discovered_pages.len();

        let truncated = discovered_pages.len() > request.max_pages;
        let pages_to_scan: Vec<String> = discovered_pages
            .into_iter()
            .take(request.max_pages)
            .collect();
        log.info(format!(
            "Pages to scan: {}{}",
            pages_to_scan.len(),
            if truncated { " (truncated)" } else { "" }
        ));
        self.console
            .print_info(&format!("Scanning {} pages", pages_to_scan.len()));

        // Concurrent page fetch over a shared cursor; aggregation merges
        // behind a mutex between awaits.
        let (aggregator, page_errors, pages_ok) = self
            .fetch_and_detect(&fetcher, &pages_to_scan, request.concurrency)
            .await;

        let mut libraries = aggregator.into_records();
        self.console
            .print_info(&format!("Detected {} unique libraries", libraries.len()));

        if request.check_vulnerabilities {
            self.console
                .print_progress("Querying OSV for known vulnerabilities...");
            let mut osv = OsvClient::new(&http_config)?;
            if let Some(ref api_url) = self.osv_api_url {
                osv = osv.with_api_url(api_url.clone());
            }
            let queried = osv.annotate(&mut libraries).await;
            log.info(format!("OSV queries: {}", queried));
        } else {
            log.info("OSV disabled");
        }

        let scan_report = report::assemble(
            discovered_count,
            pages_to_scan.len(),
            pages_ok,
            page_errors,
            libraries,
        );

        let outcome = ScanOutcome {
            report: scan_report,
            log: log.into_string(),
            duration_secs: start_time.elapsed().as_secs_f64(),
        };
        self.console.print_summary(base.as_str(), &outcome);

        Ok(outcome)
    }

    /// Fetch pages with a fixed-size worker pool pulling indices from a
    /// shared cursor, detecting and aggregating libraries as pages
    /// complete. Worker completion order is unspecified; aggregation is
    /// commutative so the records are not.
    async fn fetch_and_detect(
        &self,
        fetcher: &PageFetcher,
        pages: &[String],
        concurrency: usize,
    ) -> (Aggregator, Vec<PageError>, usize) {
        let cursor = AtomicUsize::new(0);
        let aggregator = Mutex::new(Aggregator::new());
        let page_errors = Mutex::new(Vec::new());
        let ok_count = AtomicUsize::new(0);

        let pb = self
            .console
            .create_progress_bar(pages.len() as u64, "Fetching pages");

        let worker_count = concurrency.min(pages.len()).max(1);
        let workers: Vec<_> = (0..worker_count)
            .map(|_| {
                let pb = pb.clone();
                let cursor = &cursor;
                let aggregator = &aggregator;
                let page_errors = &page_errors;
                let ok_count = &ok_count;
                async move {
                    loop {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        if index >= pages.len() {
                            break;
                        }
                        let page_url = &pages[index];

                        match fetcher.fetch_page(page_url).await {
                            Ok(html) => {
                                let detections = detect_page_assets(&html, page_url);
                                debug!(
                                    "{}: {} library detections",
                                    page_url,
                                    detections.len()
                                );
                                let mut agg = aggregator.lock().await;
                                for detection in &detections {
                                    agg.record(detection, page_url);
                                }
                                drop(agg);
                                ok_count.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(error) => {
                                debug!("{}: {}", page_url, error.error);
                                page_errors.lock().await.push(error);
                            }
                        }

                        if let Some(ref pb) = pb {
                            pb.inc(1);
                        }
                    }
                }
            })
            .collect();

        futures::future::join_all(workers).await;
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        (
            aggregator.into_inner(),
            page_errors.into_inner(),
            ok_count.into_inner(),
        )
    }
}

/// Extract assets from one page's HTML and run detection over each,
/// resolving asset URLs against the page. Assets that fail to resolve or
/// detect are dropped silently.
pub fn detect_page_assets(html: &str, page_url: &str) -> Vec<DetectedLibrary> {
    let Ok(page) = Url::parse(page_url) else {
        return Vec::new();
    };

    extract_assets(html)
        .into_iter()
        .filter_map(|asset| {
            let absolute = resolve_asset_url(&asset.url, &page)?;
            let detection = detect_library(&absolute)?;
            Some(DetectedLibrary {
                ecosystem: detection.ecosystem,
                name: detection.name,
                version: detection.version,
                source_url: absolute,
            })
        })
        .collect()
}

/// Validate and normalize the raw base URL: conservative character check,
/// default https scheme, http/https only, fragment stripped.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LibscanError::InvalidRequest("base URL is required".into()));
    }
    if !is_valid_target(trimmed) {
        return Err(LibscanError::InvalidRequest(
            "base URL contains invalid characters".into(),
        ));
    }

    // Only scheme-less input gets the https default; an explicit scheme
    // is parsed as-is so a non-http one is rejected below instead of
    // being wrapped into a second scheme.
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|_| LibscanError::InvalidRequest("base URL is invalid".into()))?;
    if !scope::is_http_scheme(&url) {
        return Err(LibscanError::InvalidRequest(
            "only http/https URLs are supported".into(),
        ));
    }

    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;

    #[test]
    fn test_normalize_base_url_defaults_scheme() {
        assert_eq!(
            normalize_base_url("example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_base_url("http://example.com/app").unwrap().as_str(),
            "http://example.com/app"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_bad_input() {
        assert!(matches!(
            normalize_base_url(""),
            Err(LibscanError::InvalidRequest(_))
        ));
        assert!(matches!(
            normalize_base_url("https://example.com/ rm -rf"),
            Err(LibscanError::InvalidRequest(_))
        ));
        assert!(matches!(
            normalize_base_url("ftp://example.com"),
            Err(LibscanError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_normalize_base_url_never_wraps_explicit_scheme() {
        // "ftp://host" must not become "https://ftp://host" with host "ftp".
        for input in ["ftp://example.com", "file:///etc/passwd", "ws://example.com"] {
            match normalize_base_url(input) {
                Err(LibscanError::InvalidRequest(msg)) => {
                    assert_eq!(msg, "only http/https URLs are supported");
                }
                other => panic!("{input} should be rejected, got {other:?}"),
            }
        }
        assert_eq!(
            normalize_base_url("HTTP://Example.com").unwrap().host_str(),
            Some("example.com")
        );
    }

    #[tokio::test]
    async fn test_scan_rejects_invalid_base_before_any_io() {
        let scanner = Scanner::new(ConsoleOutput::silent());
        let request = ScanRequest::new("https://bad host");
        assert!(matches!(
            scanner.scan(&request).await,
            Err(LibscanError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_detect_page_assets_single_library() {
        let html = r#"<html><head>
            <script src="https://cdn.jsdelivr.net/npm/lodash@4.17.20/lodash.min.js"></script>
        </head></html>"#;

        let detections = detect_page_assets(html, "https://example.com/");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].name, "lodash");
        assert_eq!(detections[0].version.as_deref(), Some("4.17.20"));
    }

    #[test]
    fn test_detect_page_assets_resolves_relative_urls() {
        let html = r#"<link rel="stylesheet" href="/css/theme_v2.3.css">"#;
        let detections = detect_page_assets(html, "https://example.com/blog/");
        assert_eq!(detections.len(), 1);
        assert_eq!(
            detections[0].source_url,
            "https://example.com/css/theme_v2.3.css"
        );
    }

    #[test]
    fn test_detect_page_assets_drops_unrecognized() {
        let html = r#"
            <script src="/static/main.abcdef123.js"></script>
            <script>inline()</script>
        "#;
        assert!(detect_page_assets(html, "https://example.com/").is_empty());
    }

    #[test]
    fn test_same_asset_on_two_pages_aggregates_once() {
        let html = r#"<script src="https://cdn.jsdelivr.net/npm/lodash@4.17.20/lodash.min.js"></script>"#;
        let mut agg = Aggregator::new();

        for page in ["https://example.com/a", "https://example.com/b"] {
            for detection in detect_page_assets(html, page) {
                agg.record(&detection, page);
            }
        }

        let records = agg.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].occurrences, 2);
        assert_eq!(records[0].pages.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_falls_back_to_base_when_discovery_fails() {
        use crate::fetch::stub;
        use std::collections::HashMap;

        // Every path 404s: no robots.txt, no sitemaps, base page dead.
        let origin = stub::serve(HashMap::new()).await;
        let scanner = Scanner::new(ConsoleOutput::silent());
        let request = ScanRequest {
            check_vulnerabilities: false,
            ..ScanRequest::new(&origin)
        };

        let outcome = scanner.scan(&request).await.unwrap();

        assert_eq!(outcome.report.pages.discovered, 1);
        assert_eq!(outcome.report.pages.scanned, 1);
        assert_eq!(outcome.report.pages.ok, 0);
        assert_eq!(outcome.report.pages.failed, 1);
        assert_eq!(outcome.report.page_errors.len(), 1);
        assert_eq!(outcome.report.page_errors[0].status, Some(404));
        assert!(outcome.report.libraries.is_empty());
        assert!(outcome
            .log
            .contains("Falling back to scanning base URL only"));
    }

    #[tokio::test]
    async fn test_scan_truncates_discovered_pages_to_max_pages() {
        use crate::fetch::stub::{self, CannedResponse};
        use std::collections::HashMap;

        let page = r#"<html><head>
            <script src="https://cdn.jsdelivr.net/npm/lodash@4.17.20/lodash.min.js"></script>
        </head></html>"#;

        let mut routes = HashMap::new();
        routes.insert(
            "/sitemap.xml",
            CannedResponse::xml(
                "<urlset>\
                 <url><loc>/p1</loc></url>\
                 <url><loc>/p2</loc></url>\
                 <url><loc>/p3</loc></url>\
                 <url><loc>/p4</loc></url>\
                 </urlset>",
            ),
        );
        routes.insert("/p1", CannedResponse::html(page));
        routes.insert("/p2", CannedResponse::html(page));
        let origin = stub::serve(routes).await;

        let scanner = Scanner::new(ConsoleOutput::silent());
        let request = ScanRequest {
            max_pages: 2,
            check_vulnerabilities: false,
            ..ScanRequest::new(&origin)
        };

        let outcome = scanner.scan(&request).await.unwrap();

        assert_eq!(outcome.report.pages.discovered, 4);
        assert_eq!(outcome.report.pages.scanned, 2);
        assert_eq!(outcome.report.pages.ok, 2);
        assert_eq!(outcome.report.pages.failed, 0);
        assert!(outcome.log.contains("Pages to scan: 2 (truncated)"));

        assert_eq!(outcome.report.libraries.len(), 1);
        assert_eq!(outcome.report.libraries[0].name, "lodash");
        assert_eq!(outcome.report.libraries[0].occurrences, 2);
    }
}
