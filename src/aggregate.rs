//! Aggregation of per-asset detections into unique library records.

use crate::types::{DetectedLibrary, Ecosystem, LibraryRecord};
use std::collections::HashMap;

/// Maximum pages/sources retained per library. Occurrence counting is
/// unaffected; past the cap only membership tracking stops.
pub const PROVENANCE_CAP: usize = 50;

/// Aggregation key: `ecosystem:name@version`, with `unknown` standing in
/// for an absent ecosystem or version. Case-sensitive on the name, exact
/// on the version string.
pub fn identity_key(ecosystem: Option<Ecosystem>, name: &str, version: Option<&str>) -> String {
    format!(
        "{}:{}@{}",
        ecosystem.map(|e| e.as_str()).unwrap_or("unknown"),
        name,
        version.unwrap_or("unknown")
    )
}

#[derive(Debug)]
struct Entry {
    ecosystem: Option<Ecosystem>,
    name: String,
    version: Option<String>,
    occurrences: usize,
    pages: Vec<String>,
    sources: Vec<String>,
}

/// Identity-keyed merge map, owned by one scan invocation.
///
/// Merging is commutative, so the records that come out do not depend on
/// page completion order (capped pages/sources excepted, which hold an
/// arbitrary first-seen subset once truncated).
#[derive(Debug, Default)]
pub struct Aggregator {
    map: HashMap<String, Entry>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one (page, asset) observation of a detected library.
    pub fn record(&mut self, lib: &DetectedLibrary, page_url: &str) {
        let key = identity_key(lib.ecosystem, &lib.name, lib.version.as_deref());

        let entry = self.map.entry(key).or_insert_with(|| Entry {
            ecosystem: lib.ecosystem,
            name: lib.name.clone(),
            version: lib.version.clone(),
            occurrences: 0,
            pages: Vec::new(),
            sources: Vec::new(),
        });

        entry.occurrences += 1;
        push_capped(&mut entry.pages, page_url);
        push_capped(&mut entry.sources, &lib.source_url);
    }

    /// Number of unique library identities seen so far.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Consume the map into unadorned library records (vulnerability
    /// fields zeroed; the reconciler fills them in later).
    pub fn into_records(self) -> Vec<LibraryRecord> {
        self.map
            .into_values()
            .map(|entry| LibraryRecord {
                ecosystem: entry.ecosystem,
                name: entry.name,
                version: entry.version,
                pages: entry.pages,
                sources: entry.sources,
                occurrences: entry.occurrences,
                vulnerability_count: 0,
                vulnerability_ids: Vec::new(),
                vulnerabilities: None,
                vulnerability_error: None,
            })
            .collect()
    }
}

fn push_capped(list: &mut Vec<String>, value: &str) {
    if list.len() < PROVENANCE_CAP && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lodash(source_url: &str) -> DetectedLibrary {
        DetectedLibrary {
            ecosystem: Some(Ecosystem::Npm),
            name: "lodash".to_string(),
            version: Some("4.17.20".to_string()),
            source_url: source_url.to_string(),
        }
    }

    #[test]
    fn test_identity_key() {
        assert_eq!(
            identity_key(Some(Ecosystem::Npm), "lodash", Some("4.17.20")),
            "npm:lodash@4.17.20"
        );
        assert_eq!(identity_key(None, "mystery", None), "unknown:mystery@unknown");
    }

    #[test]
    fn test_single_observation() {
        let mut agg = Aggregator::new();
        agg.record(&lodash("https://cdn.example.com/lodash.js"), "https://example.com/");

        let records = agg.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].occurrences, 1);
        assert_eq!(records[0].pages, vec!["https://example.com/".to_string()]);
        assert_eq!(records[0].vulnerability_count, 0);
    }

    #[test]
    fn test_same_asset_on_two_pages_merges() {
        let mut agg = Aggregator::new();
        let lib = lodash("https://cdn.example.com/lodash.js");
        agg.record(&lib, "https://example.com/a");
        agg.record(&lib, "https://example.com/b");

        let records = agg.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].occurrences, 2);
        assert_eq!(records[0].pages.len(), 2);
        assert_eq!(records[0].sources.len(), 1);
    }

    #[test]
    fn test_name_is_case_sensitive_and_version_exact() {
        let mut agg = Aggregator::new();
        let mut upper = lodash("https://cdn.example.com/lodash.js");
        upper.name = "Lodash".to_string();
        agg.record(&lodash("https://cdn.example.com/lodash.js"), "https://example.com/");
        agg.record(&upper, "https://example.com/");

        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_occurrences_keep_counting_past_provenance_cap() {
        let mut agg = Aggregator::new();
        let lib = lodash("https://cdn.example.com/lodash.js");
        for i in 0..(PROVENANCE_CAP + 25) {
            agg.record(&lib, &format!("https://example.com/page-{}", i));
        }

        let records = agg.into_records();
        assert_eq!(records[0].occurrences, PROVENANCE_CAP + 25);
        assert_eq!(records[0].pages.len(), PROVENANCE_CAP);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = lodash("https://cdn.example.com/a.js");
        let mut b = lodash("https://cdn.example.com/b.js");
        b.name = "react".to_string();

        let mut forward = Aggregator::new();
        forward.record(&a, "https://example.com/1");
        forward.record(&b, "https://example.com/1");
        forward.record(&a, "https://example.com/2");

        let mut reverse = Aggregator::new();
        reverse.record(&a, "https://example.com/2");
        reverse.record(&b, "https://example.com/1");
        reverse.record(&a, "https://example.com/1");

        let count = |records: Vec<LibraryRecord>| {
            let mut pairs: Vec<(String, usize)> = records
                .into_iter()
                .map(|r| (r.name, r.occurrences))
                .collect();
            pairs.sort();
            pairs
        };
        assert_eq!(count(forward.into_records()), count(reverse.into_records()));
    }
}
