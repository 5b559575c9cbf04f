//! Sitemap loading: recursive index expansion into a flat page list.

use crate::fetch::PageFetcher;
use crate::scope;
use flate2::read::GzDecoder;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::io::Read;
use std::sync::LazyLock;
use tracing::{debug, trace};
use url::Url;

const SITEMAP_ACCEPT: &str = "application/xml,text/xml,*/*";

static LOC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<loc>(.*?)</loc>").unwrap());
static SITEMAP_INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<sitemapindex\b").unwrap());

/// Pages collected from sitemaps plus the number of sitemap documents
/// actually fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapPages {
    pub page_urls: Vec<String>,
    pub sitemaps_visited: usize,
}

/// Strip a CDATA wrapper and decode the XML character entities sitemaps
/// use in practice.
pub fn decode_xml_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let unwrapped = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(trimmed);

    unwrapped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Extract all `<loc>` entry values from a sitemap document.
pub fn extract_locs(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .map(|caps| decode_xml_text(&caps[1]))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// True when the document is a sitemap index (entries are further
/// sitemaps, not pages).
pub fn is_sitemap_index(xml: &str) -> bool {
    SITEMAP_INDEX_RE.is_match(xml)
}

/// Decode a sitemap body: gunzip when the URL ends in `.gz`, falling back
/// to the raw bytes when decompression fails.
pub fn decode_sitemap_body(url: &str, body: &[u8]) -> String {
    if url.to_lowercase().ends_with(".gz") {
        let mut decoder = GzDecoder::new(body);
        let mut text = String::new();
        if decoder.read_to_string(&mut text).is_ok() {
            return text;
        }
        debug!("Gunzip failed for {}, treating body as plain text", url);
    }
    String::from_utf8_lossy(body).into_owned()
}

/// Expand candidate sitemap URLs into a deduplicated in-scope page list.
///
/// FIFO work queue, deduplicated by URL; stops once `max_sitemaps`
/// documents have been fetched even if the queue is non-empty. Index
/// documents enqueue their `<loc>` entries as further sitemaps; leaf
/// documents contribute scope-filtered page URLs. An unreachable or
/// unparsable sitemap is skipped silently.
pub async fn load_sitemap_pages(
    fetcher: &PageFetcher,
    origin: &Url,
    candidates: &[String],
    max_sitemaps: usize,
) -> SitemapPages {
    let mut queue: VecDeque<String> = candidates.iter().cloned().collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut page_urls: Vec<String> = Vec::new();

    while let Some(next) = queue.pop_front() {
        if visited.len() >= max_sitemaps {
            debug!("Sitemap budget exhausted with {} queued", queue.len() + 1);
            break;
        }
        if !visited.insert(next.clone()) {
            continue;
        }

        let xml = match fetcher.fetch_raw(&next, SITEMAP_ACCEPT).await {
            Ok(res) if res.ok => decode_sitemap_body(&next, &res.body),
            Ok(res) => {
                trace!("Sitemap {} returned HTTP {}", next, res.status);
                continue;
            }
            Err(e) => {
                trace!("Sitemap {} fetch failed: {}", next, e);
                continue;
            }
        };

        let locs = extract_locs(&xml);
        if locs.is_empty() {
            continue;
        }

        if is_sitemap_index(&xml) {
            for loc in locs {
                if let Ok(resolved) = origin.join(&loc) {
                    queue.push_back(resolved.to_string());
                }
            }
            continue;
        }

        for loc in locs {
            if let Some(page) = scope::normalize_in_scope(&loc, origin) {
                page_urls.push(page);
            }
        }
    }

    let mut seen = HashSet::new();
    page_urls.retain(|p| seen.insert(p.clone()));

    SitemapPages {
        page_urls,
        sitemaps_visited: visited.len(),
    }
}
