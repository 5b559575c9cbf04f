//! Configuration handling for the scanner.

use crate::types::HttpConfig;
use clap::Parser;
use std::path::PathBuf;

/// Clamp limits for scan options (min, max, default).
pub const MAX_PAGES_RANGE: (usize, usize, usize) = (1, 500, 60);
pub const MAX_SITEMAPS_RANGE: (usize, usize, usize) = (1, 100, 20);
pub const CONCURRENCY_RANGE: (usize, usize, usize) = (1, 20, 6);
pub const TIMEOUT_MS_RANGE: (u64, u64, u64) = (2_000, 60_000, 12_000);

/// Library version scanner with OSV vulnerability lookup.
#[derive(Parser, Debug, Clone)]
#[command(name = "libscan")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the site to scan
    pub base_url: String,

    /// Explicit seed page URLs (may be repeated)
    #[arg(long = "url")]
    pub urls: Vec<String>,

    /// File containing seed page URLs (one per line)
    #[arg(short = 'f', long)]
    pub urls_file: Option<PathBuf>,

    /// Maximum number of pages to fetch
    #[arg(long, default_value = "60")]
    pub max_pages: usize,

    /// Maximum number of sitemap documents to fetch
    #[arg(long, default_value = "20")]
    pub max_sitemaps: usize,

    /// Number of concurrent page fetches
    #[arg(short = 'c', long, default_value = "6")]
    pub concurrency: usize,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "12000")]
    pub timeout_ms: u64,

    /// Skip the OSV vulnerability lookup phase
    #[arg(long)]
    pub no_osv: bool,

    /// Custom User-Agent string
    #[arg(long, env = "LIBSCAN_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Output file path for the JSON report (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode: suppress progress, only print the summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl Config {
    /// Build the engine request from CLI arguments, merging seed URLs from
    /// `--url` flags and the optional urls file.
    pub fn to_request(&self) -> crate::types::Result<ScanRequest> {
        let mut urls = self.urls.clone();

        if let Some(ref file_path) = self.urls_file {
            let content = std::fs::read_to_string(file_path)?;
            for line in content.lines() {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    urls.push(trimmed.to_string());
                }
            }
        }

        Ok(ScanRequest {
            base_url: self.base_url.clone(),
            urls,
            max_pages: self.max_pages,
            max_sitemaps: self.max_sitemaps,
            concurrency: self.concurrency,
            request_timeout_ms: self.timeout_ms,
            check_vulnerabilities: !self.no_osv,
        })
    }

    /// Get HTTP configuration from CLI arguments.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout_ms: clamp(self.timeout_ms, TIMEOUT_MS_RANGE),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| HttpConfig::default().user_agent),
        }
    }
}

/// One scan invocation's input: base URL plus bounded options.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub base_url: String,
    /// Optional explicit seed pages, resolved and scope-filtered later.
    pub urls: Vec<String>,
    pub max_pages: usize,
    pub max_sitemaps: usize,
    pub concurrency: usize,
    pub request_timeout_ms: u64,
    pub check_vulnerabilities: bool,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            urls: Vec::new(),
            max_pages: MAX_PAGES_RANGE.2,
            max_sitemaps: MAX_SITEMAPS_RANGE.2,
            concurrency: CONCURRENCY_RANGE.2,
            request_timeout_ms: TIMEOUT_MS_RANGE.2,
            check_vulnerabilities: true,
        }
    }
}

impl ScanRequest {
    /// New request for a base URL with default options.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Return a copy with every numeric option clamped into its valid
    /// range. Out-of-range values are pulled to the nearest bound, never
    /// rejected.
    pub fn clamped(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            urls: self.urls.clone(),
            max_pages: clamp(self.max_pages, MAX_PAGES_RANGE),
            max_sitemaps: clamp(self.max_sitemaps, MAX_SITEMAPS_RANGE),
            concurrency: clamp(self.concurrency, CONCURRENCY_RANGE),
            request_timeout_ms: clamp(self.request_timeout_ms, TIMEOUT_MS_RANGE),
            check_vulnerabilities: self.check_vulnerabilities,
        }
    }
}

fn clamp<T: Ord + Copy>(value: T, (min, max, _default): (T, T, T)) -> T {
    value.max(min).min(max)
}

/// Conservative allowed-character check applied to the raw base URL before
/// any parsing. Rejects whitespace, control characters, and anything
/// outside the URL character set.
pub fn is_valid_target(raw: &str) -> bool {
    !raw.is_empty()
        && raw.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    '-' | '.' | '_' | '~' | ':' | '/' | '?' | '#' | '[' | ']' | '@' | '!' | '$'
                        | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' | '%'
                )
        })
}
