//! Static HTML asset extraction.
//!
//! Pulls `<script src>` and stylesheet `<link href>` references out of
//! page HTML with tag-level regex scanning. No script execution, no DOM;
//! whatever the markup declares is what gets extracted.

use crate::types::{Asset, AssetKind};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static SCRIPT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<script\b[^>]*>").unwrap());
static LINK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<link\b[^>]*>").unwrap());

static SRC_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("src"));
static HREF_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("href"));
static REL_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("rel"));

static CSS_HREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.css([?#]|$)").unwrap());

fn attr_regex(name: &str) -> Regex {
    // Values may be double-quoted, single-quoted, or bare up to
    // whitespace / '>'.
    Regex::new(&format!(
        r#"(?i)\b{name}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#
    ))
    .unwrap()
}

fn get_attr(tag: &str, re: &Regex) -> Option<String> {
    let caps = re.captures(tag)?;
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Extract script/stylesheet asset references from page HTML.
///
/// A `<link>` counts as a stylesheet when its `rel` token list contains
/// `stylesheet`, or when its `href` ends in `.css` (optionally followed by
/// a query or fragment).
pub fn extract_assets(html: &str) -> Vec<Asset> {
    let mut assets = Vec::new();

    for m in SCRIPT_TAG_RE.find_iter(html) {
        if let Some(src) = get_attr(m.as_str(), &SRC_ATTR_RE) {
            assets.push(Asset {
                url: src,
                kind: AssetKind::Script,
            });
        }
    }

    for m in LINK_TAG_RE.find_iter(html) {
        let tag = m.as_str();
        let Some(href) = get_attr(tag, &HREF_ATTR_RE) else {
            continue;
        };

        let rel = get_attr(tag, &REL_ATTR_RE).unwrap_or_default().to_lowercase();
        let is_stylesheet = rel.split_whitespace().any(|t| t == "stylesheet")
            || CSS_HREF_RE.is_match(&href);
        if !is_stylesheet {
            continue;
        }

        assets.push(Asset {
            url: href,
            kind: AssetKind::Style,
        });
    }

    assets
}

/// Resolve a captured asset URL against its page URL. Resolution failure
/// drops the asset (returns `None`) rather than raising an error.
pub fn resolve_asset_url(asset_url: &str, page_url: &Url) -> Option<String> {
    page_url.join(asset_url).ok().map(|u| u.to_string())
}
