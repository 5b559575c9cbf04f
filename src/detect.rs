//! Heuristic library detection from asset URLs.
//!
//! Maps an absolute script/stylesheet URL to a best-effort
//! (ecosystem, name, version) guess. Host-specific CDN matchers run in a
//! fixed order before two generic fallbacks; the first match wins. Not
//! every script is a library, so `None` is a common and silent outcome.
//!
//! The generic fallbacks are deliberately permissive: `app-1.2.3.min.js`
//! detects as `app@1.2.3` even when it is first-party code. There is no
//! allowlist to validate against, so that noise is accepted rather than
//! suppressed.

use crate::types::Ecosystem;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Numeric dotted version, optionally with a pre-release/build suffix.
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+){0,3}(?:[-+][0-9A-Za-z.-]+)?$").unwrap());

static JQUERY_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^jquery-(\d+(?:\.\d+){0,3}(?:[-+][0-9A-Za-z.-]+)?)\b").unwrap()
});

static STEM_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(min|bundle|umd|prod|production)\b").unwrap());
static STEM_EXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(js|css)\b").unwrap());

static MIN_BUNDLE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:min|bundle)\.(js|css)$").unwrap());
static FILE_EXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(js|css)$").unwrap());

static NAME_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)[-_]v?(\d+(?:\.\d+){0,3}(?:[-+][0-9A-Za-z.-]+)?)$").unwrap()
});

/// A library guess for one asset URL, before page attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub ecosystem: Option<Ecosystem>,
    pub name: String,
    pub version: Option<String>,
}

impl Detection {
    fn npm(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            ecosystem: Some(Ecosystem::Npm),
            name: name.into(),
            version,
        }
    }
}

type Matcher = fn(&Url, &[String]) -> Option<Detection>;

/// Ordered first-match-wins heuristics. CDN-specific matchers first, the
/// permissive generic ones last.
const MATCHERS: &[Matcher] = &[
    match_jsdelivr,
    match_unpkg,
    match_ajax_libs,
    match_jquery_cdn,
    match_bootstrapcdn,
    match_version_query,
    match_generic_filename,
];

/// Detect the library behind an absolute asset URL.
///
/// Pure function: the same URL always yields the same detection.
/// Unparsable URLs and unrecognized assets return `None`.
pub fn detect_library(asset_url: &str) -> Option<Detection> {
    let url = Url::parse(asset_url).ok()?;
    let path_parts: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    MATCHERS
        .iter()
        .find_map(|matcher| matcher(&url, &path_parts))
}

/// True when the string is a plausible numeric version.
pub fn looks_like_version(value: &str) -> bool {
    VERSION_RE.is_match(value.trim())
}

/// Split `name@version` at the last `@`. An `@` at position 0 (scope
/// prefix) or a missing/empty version yields no version.
fn split_at_last_at(value: &str) -> (&str, Option<&str>) {
    match value.rfind('@') {
        Some(idx) if idx > 0 => {
            let (left, right) = value.split_at(idx);
            let right = &right[1..];
            (left, if right.is_empty() { None } else { Some(right) })
        }
        _ => (value, None),
    }
}

/// Derive a package-name guess from a filename by dropping build-artifact
/// suffixes and the extension.
fn infer_name_from_filename(filename: &str) -> Option<String> {
    let no_query = filename.split(['?', '#']).next().unwrap_or(filename);
    let stripped = STEM_SUFFIX_RE.replace_all(no_query, "");
    let stripped = STEM_EXT_RE.replace_all(&stripped, "");
    let cleaned = stripped.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// cdn.jsdelivr.net `/npm/<pkg>@<version>/...` paths, scoped or not.
fn match_jsdelivr(url: &Url, path_parts: &[String]) -> Option<Detection> {
    if url.host_str() != Some("cdn.jsdelivr.net") {
        return None;
    }
    let npm_idx = path_parts.iter().position(|p| p == "npm")?;
    let first = path_parts.get(npm_idx + 1)?;

    // A scoped path with no package segment degrades to the bare split
    // below rather than failing the whole matcher.
    if first.starts_with('@') {
        if let Some(second) = path_parts.get(npm_idx + 2) {
            let (left, right) = split_at_last_at(second);
            return Some(Detection::npm(
                format!("{}/{}", first, left),
                right.map(str::to_string),
            ));
        }
    }

    let (left, right) = split_at_last_at(first);
    Some(Detection::npm(left, right.map(str::to_string)))
}

/// unpkg.com `/<pkg>@<version>/...` paths, scoped or not.
fn match_unpkg(url: &Url, path_parts: &[String]) -> Option<Detection> {
    if url.host_str() != Some("unpkg.com") {
        return None;
    }
    let first = path_parts.first()?;

    if first.starts_with('@') {
        if let Some(second) = path_parts.get(1) {
            let (left, right) = split_at_last_at(second);
            return Some(Detection::npm(
                format!("{}/{}", first, left),
                right.map(str::to_string),
            ));
        }
    }

    let (left, right) = split_at_last_at(first);
    Some(Detection::npm(left, right.map(str::to_string)))
}

/// cdnjs / Google Hosted Libraries `ajax/libs/<name>/<version>/...` paths.
fn match_ajax_libs(url: &Url, path_parts: &[String]) -> Option<Detection> {
    let host = url.host_str()?;
    if host != "cdnjs.cloudflare.com" && host != "ajax.googleapis.com" {
        return None;
    }

    let ajax_idx = path_parts.iter().position(|p| p == "ajax")?;
    let libs_idx = path_parts.iter().position(|p| p == "libs")?;
    if libs_idx != ajax_idx + 1 {
        return None;
    }

    let name = path_parts.get(ajax_idx + 2)?;
    let version = path_parts.get(ajax_idx + 3)?;
    Some(Detection::npm(
        name,
        looks_like_version(version).then(|| version.clone()),
    ))
}

/// code.jquery.com `jquery-<version>[.min].js` filenames.
fn match_jquery_cdn(url: &Url, path_parts: &[String]) -> Option<Detection> {
    if url.host_str() != Some("code.jquery.com") {
        return None;
    }
    let file = path_parts.last()?;
    let caps = JQUERY_FILE_RE.captures(file)?;
    Some(Detection::npm("jquery", Some(caps[1].to_string())))
}

/// *.bootstrapcdn.com `<name>/<version>/...` paths.
fn match_bootstrapcdn(url: &Url, path_parts: &[String]) -> Option<Detection> {
    let host = url.host_str()?;
    if !host.ends_with("bootstrapcdn.com") {
        return None;
    }
    if path_parts.len() < 2 {
        return None;
    }

    let name = &path_parts[0];
    let version = &path_parts[1];
    Some(Detection::npm(
        name,
        looks_like_version(version).then(|| version.clone()),
    ))
}

/// Any host: a `ver`/`version`/`v` query parameter with a numeric value,
/// paired with the filename stem as the name. Common on WordPress sites.
fn match_version_query(url: &Url, path_parts: &[String]) -> Option<Detection> {
    let version = ["ver", "version", "v"].iter().find_map(|key| {
        // An empty value counts as absent, so "?ver=&v=1.2.3" still
        // resolves through the later keys.
        let value = url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())?;
        (!value.is_empty()).then_some(value)
    })?;
    if !looks_like_version(&version) {
        return None;
    }

    let file = path_parts.last()?;
    let name = infer_name_from_filename(file)?;
    Some(Detection::npm(name, Some(version)))
}

/// Generic fallback for `.js`/`.css` filenames carrying a trailing
/// `-<version>` or `_v<version>` suffix.
fn match_generic_filename(_url: &Url, path_parts: &[String]) -> Option<Detection> {
    let file = path_parts.last()?;
    let lower = file.to_lowercase();
    if !lower.ends_with(".js") && !lower.ends_with(".css") {
        return None;
    }

    let base = MIN_BUNDLE_EXT_RE.replace(file, ".$1");
    let base = FILE_EXT_RE.replace(&base, "");

    let caps = NAME_VERSION_RE.captures(&base)?;
    Some(Detection::npm(
        caps[1].to_string(),
        Some(caps[2].to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(url: &str) -> Option<(String, Option<String>)> {
        detect_library(url).map(|d| (d.name, d.version))
    }

    #[test]
    fn test_looks_like_version() {
        assert!(looks_like_version("4"));
        assert!(looks_like_version("4.17.20"));
        assert!(looks_like_version("1.2.3.4"));
        assert!(looks_like_version("2.0.0-beta.1"));
        assert!(looks_like_version("3.1.0+build.5"));
        assert!(!looks_like_version("abcdef123"));
        assert!(!looks_like_version("v4.17.20"));
        assert!(!looks_like_version("1.2.3.4.5"));
        assert!(!looks_like_version(""));
    }

    #[test]
    fn test_jsdelivr_unscoped() {
        assert_eq!(
            detect("https://cdn.jsdelivr.net/npm/lodash@4.17.20/lodash.min.js"),
            Some(("lodash".to_string(), Some("4.17.20".to_string())))
        );
    }

    #[test]
    fn test_jsdelivr_scoped() {
        assert_eq!(
            detect("https://cdn.jsdelivr.net/npm/@popperjs/core@2.11.8/dist/umd/popper.min.js"),
            Some(("@popperjs/core".to_string(), Some("2.11.8".to_string())))
        );
    }

    #[test]
    fn test_jsdelivr_without_version() {
        assert_eq!(
            detect("https://cdn.jsdelivr.net/npm/lodash/lodash.min.js"),
            Some(("lodash".to_string(), None))
        );
    }

    #[test]
    fn test_scope_without_package_segment_keeps_scope_name() {
        assert_eq!(
            detect("https://cdn.jsdelivr.net/npm/@popperjs"),
            Some(("@popperjs".to_string(), None))
        );
        assert_eq!(
            detect("https://unpkg.com/@popperjs"),
            Some(("@popperjs".to_string(), None))
        );
    }

    #[test]
    fn test_unpkg() {
        assert_eq!(
            detect("https://unpkg.com/react@18.2.0/umd/react.production.min.js"),
            Some(("react".to_string(), Some("18.2.0".to_string())))
        );
        assert_eq!(
            detect("https://unpkg.com/@scope/pkg@1.0.0/dist/index.js"),
            Some(("@scope/pkg".to_string(), Some("1.0.0".to_string())))
        );
    }

    #[test]
    fn test_cdnjs() {
        assert_eq!(
            detect("https://cdnjs.cloudflare.com/ajax/libs/moment.js/2.29.4/moment.min.js"),
            Some(("moment.js".to_string(), Some("2.29.4".to_string())))
        );
    }

    #[test]
    fn test_googleapis_non_numeric_version_dropped() {
        assert_eq!(
            detect("https://ajax.googleapis.com/ajax/libs/webfont/latest/webfont.js"),
            Some(("webfont".to_string(), None))
        );
    }

    #[test]
    fn test_jquery_cdn() {
        assert_eq!(
            detect("https://code.jquery.com/jquery-3.6.0.min.js"),
            Some(("jquery".to_string(), Some("3.6.0".to_string())))
        );
        // A non-jquery filename on the jquery CDN falls through to the
        // generic filename heuristic.
        assert_eq!(
            detect("https://code.jquery.com/other-3.6.0.js"),
            Some(("other".to_string(), Some("3.6.0".to_string())))
        );
    }

    #[test]
    fn test_bootstrapcdn() {
        assert_eq!(
            detect("https://maxcdn.bootstrapcdn.com/bootstrap/4.5.2/css/bootstrap.min.css"),
            Some(("bootstrap".to_string(), Some("4.5.2".to_string())))
        );
        assert_eq!(
            detect("https://stackpath.bootstrapcdn.com/font-awesome/4.7.0/css/font-awesome.min.css"),
            Some(("font-awesome".to_string(), Some("4.7.0".to_string())))
        );
    }

    #[test]
    fn test_version_query_param() {
        assert_eq!(
            detect("https://example.com/wp-includes/js/jquery/jquery.min.js?ver=3.7.1"),
            Some(("jquery".to_string(), Some("3.7.1".to_string())))
        );
        // Non-numeric values are not versions.
        assert_eq!(
            detect("https://example.com/assets/app.js?v=deadbeef"),
            None
        );
    }

    #[test]
    fn test_version_query_empty_value_falls_through() {
        assert_eq!(
            detect("https://example.com/assets/jquery.min.js?ver=&v=1.2.3"),
            Some(("jquery".to_string(), Some("1.2.3".to_string())))
        );
        assert_eq!(
            detect("https://example.com/assets/jquery.min.js?ver=&version=2.0.1"),
            Some(("jquery".to_string(), Some("2.0.1".to_string())))
        );
    }

    #[test]
    fn test_generic_filename_suffix() {
        assert_eq!(
            detect("https://example.com/js/slick-1.8.1.min.js"),
            Some(("slick".to_string(), Some("1.8.1".to_string())))
        );
        assert_eq!(
            detect("https://example.com/css/theme_v2.3.css"),
            Some(("theme".to_string(), Some("2.3".to_string())))
        );
    }

    #[test]
    fn test_generic_requires_js_or_css_extension() {
        assert_eq!(detect("https://example.com/download/tool-1.2.3.zip"), None);
        assert_eq!(detect("https://example.com/api/v1/data"), None);
    }

    #[test]
    fn test_hash_named_bundle_not_detected() {
        assert_eq!(detect("https://example.com/static/main.abcdef123.js"), None);
    }

    #[test]
    fn test_first_match_wins_over_query_param() {
        // jsdelivr heuristic outranks the generic query-parameter one.
        assert_eq!(
            detect("https://cdn.jsdelivr.net/npm/vue@3.4.0/dist/vue.global.js?ver=9.9.9"),
            Some(("vue".to_string(), Some("3.4.0".to_string())))
        );
    }

    #[test]
    fn test_detection_is_idempotent() {
        let url = "https://cdn.jsdelivr.net/npm/lodash@4.17.20/lodash.min.js";
        assert_eq!(detect_library(url), detect_library(url));
    }

    #[test]
    fn test_unparsable_url() {
        assert_eq!(detect_library("not a url"), None);
        assert_eq!(detect_library("/relative/only.js"), None);
    }

    #[test]
    fn test_ecosystem_is_npm_when_detected() {
        let d = detect_library("https://unpkg.com/axios@1.6.0/dist/axios.min.js").unwrap();
        assert_eq!(d.ecosystem, Some(Ecosystem::Npm));
    }
}
