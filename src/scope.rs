//! Host-scope enforcement for crawled and caller-supplied URLs.
//!
//! A URL is in scope when its hostname (after `www.` stripping, both
//! sides) equals the base hostname or is a strict subdomain of it. Only
//! http/https URLs ever pass.

use url::Url;

/// Lowercase a hostname and strip a single leading `www.`.
pub fn strip_www(hostname: &str) -> String {
    let lower = hostname.to_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// True when the URL scheme is http or https.
pub fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Scope predicate: same host, or strict subdomain of the base host.
///
/// The base host must itself contain a dot before subdomains are allowed,
/// so a bare `localhost` base never pulls in `evil.localhost`.
pub fn is_allowed_host(base: &Url, candidate: &Url) -> bool {
    let base_host = match base.host_str() {
        Some(h) => strip_www(h),
        None => return false,
    };
    let candidate_host = match candidate.host_str() {
        Some(h) => strip_www(h),
        None => return false,
    };

    if candidate_host == base_host {
        return true;
    }
    if !base_host.contains('.') {
        return false;
    }
    candidate_host.ends_with(&format!(".{}", base_host))
}

/// Resolve a candidate URL against the base origin and enforce scope:
/// http/https only, allowed host, fragment removed. Returns the
/// normalized string form, or `None` when out of scope or unparsable.
pub fn normalize_in_scope(raw: &str, base: &Url) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut parsed = base.join(trimmed).ok()?;
    if !is_http_scheme(&parsed) {
        return None;
    }
    if !is_allowed_host(base, &parsed) {
        return None;
    }

    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Normalize a caller-supplied URL list: resolve, scope-filter, dedupe,
/// preserving first-seen order.
pub fn normalize_seed_urls(raw_urls: &[String], base: &Url) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for raw in raw_urls {
        let Some(normalized) = normalize_in_scope(raw, base) else {
            continue;
        };
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }

    out
}

/// Union of seed-derived and sitemap-derived page lists, seeds first,
/// first-seen order, deduplicated by string form.
pub fn union_pages(seed_pages: &[String], sitemap_pages: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for url in seed_pages.iter().chain(sitemap_pages.iter()) {
        if seen.insert(url.clone()) {
            out.push(url.clone());
        }
    }

    out
}
