//! Sitemap candidate discovery from robots.txt.

use crate::fetch::PageFetcher;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

const ROBOTS_ACCEPT: &str = "text/plain,*/*";

/// Well-known sitemap paths tried after any robots.txt directives.
pub const SITEMAP_FALLBACKS: &[&str] =
    &["/sitemap.xml", "/sitemap_index.xml", "/sitemap-index.xml"];

static SITEMAP_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*sitemap\s*:\s*(\S+)\s*$").unwrap());

/// Parse `Sitemap:` directives out of a robots.txt body, resolving each
/// against the base origin. Malformed lines and unresolvable URLs are
/// ignored.
pub fn parse_sitemap_directives(robots_text: &str, origin: &Url) -> Vec<String> {
    let mut directives = Vec::new();

    for line in robots_text.lines() {
        let Some(caps) = SITEMAP_DIRECTIVE_RE.captures(line) else {
            continue;
        };
        let raw = &caps[1];
        match origin.join(raw) {
            Ok(resolved) => directives.push(resolved.to_string()),
            Err(e) => debug!("Ignoring unresolvable sitemap directive {:?}: {}", raw, e),
        }
    }

    directives
}

/// Produce the deduplicated ordered list of candidate sitemap URLs for a
/// base origin: robots.txt directives first, then the fixed fallbacks.
///
/// A robots.txt fetch failure only drops the directive-based candidates;
/// the fallbacks are always present, and no error is ever raised.
pub async fn discover_sitemap_urls(fetcher: &PageFetcher, origin: &Url) -> Vec<String> {
    let mut candidates = Vec::new();

    if let Ok(robots_url) = origin.join("/robots.txt") {
        match fetcher.fetch_raw(robots_url.as_str(), ROBOTS_ACCEPT).await {
            Ok(res) if res.ok => {
                let text = String::from_utf8_lossy(&res.body);
                candidates.extend(parse_sitemap_directives(&text, origin));
            }
            Ok(res) => debug!("robots.txt returned HTTP {}", res.status),
            Err(e) => debug!("robots.txt fetch failed: {}", e),
        }
    }

    for suffix in SITEMAP_FALLBACKS {
        if let Ok(resolved) = origin.join(suffix) {
            candidates.push(resolved.to_string());
        }
    }

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}
