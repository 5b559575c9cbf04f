//! OSV vulnerability-database client and reconciliation.
//!
//! Eligible libraries (npm ecosystem, strict numeric version) are batched
//! into `querybatch` requests; results come back aligned 1:1 with the
//! query order. Failures stay scoped: a failed batch marks only its own
//! items, and a missing per-item result marks only that item.

use crate::detect::looks_like_version;
use crate::types::{Ecosystem, HttpConfig, LibraryRecord, Result, VulnSummary};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

const OSV_BATCH_URL: &str = "https://api.osv.dev/v1/querybatch";

/// Queries per batch request.
pub const OSV_BATCH_SIZE: usize = 50;

/// Vulnerability summaries retained per library in the report.
pub const MAX_VULN_SUMMARIES: usize = 10;

#[derive(Debug, Serialize)]
pub struct OsvQuery {
    pub package: OsvPackage,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct OsvPackage {
    pub ecosystem: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct OsvBatchRequest<'a> {
    queries: &'a [OsvQuery],
}

#[derive(Debug, Deserialize)]
struct OsvBatchResponse {
    #[serde(default)]
    results: Vec<OsvBatchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct OsvBatchResult {
    #[serde(default)]
    vulns: Option<Vec<OsvVulnerability>>,
}

/// One vulnerability record as returned by the OSV API.
#[derive(Debug, Clone, Deserialize)]
pub struct OsvVulnerability {
    pub id: String,
    pub summary: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub modified: Option<String>,
    pub published: Option<String>,
    pub references: Option<Vec<OsvReference>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvReference {
    pub url: Option<String>,
}

/// Per-item outcome of one batch query, aligned to query order.
#[derive(Debug)]
pub enum BatchItemResult {
    Vulns(Vec<OsvVulnerability>),
    Error(String),
}

/// Eligibility for an OSV lookup: npm ecosystem plus a version matching
/// the strict numeric pattern. A hash-named bundle version like
/// `abcdef123` never qualifies.
pub fn is_eligible(record: &LibraryRecord) -> bool {
    record.ecosystem == Some(Ecosystem::Npm)
        && record
            .version
            .as_deref()
            .map(looks_like_version)
            .unwrap_or(false)
}

/// Project an OSV record into the report's read-only summary form.
pub fn summarize(vuln: &OsvVulnerability) -> VulnSummary {
    VulnSummary {
        id: vuln.id.clone(),
        summary: vuln.summary.clone(),
        aliases: vuln.aliases.clone(),
        modified: vuln.modified.clone(),
        published: vuln.published.clone(),
        references: vuln.references.as_ref().map(|refs| {
            refs.iter()
                .filter_map(|r| r.url.clone())
                .collect()
        }),
    }
}

/// Client for the OSV batch-query endpoint.
pub struct OsvClient {
    client: Client,
    api_url: String,
}

impl OsvClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .http1_only()
            .build()?;

        Ok(Self {
            client,
            api_url: OSV_BATCH_URL.to_string(),
        })
    }

    /// Override the endpoint (alternate deployments, tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Submit one batch and return per-item results aligned to the query
    /// order. This never fails as a whole: transport/HTTP/parse failures
    /// become the same error on every item of the batch.
    pub async fn query_batch(&self, queries: &[OsvQuery]) -> Vec<BatchItemResult> {
        if queries.is_empty() {
            return Vec::new();
        }

        trace!("OSV batch of {} queries", queries.len());
        let response = match self
            .client
            .post(&self.api_url)
            .json(&OsvBatchRequest { queries })
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return batch_error(queries.len(), e.to_string()),
        };

        if !response.status().is_success() {
            return batch_error(
                queries.len(),
                format!("OSV request failed ({}).", response.status().as_u16()),
            );
        }

        let parsed: OsvBatchResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => return batch_error(queries.len(), e.to_string()),
        };

        align_results(queries.len(), parsed.results)
    }

    /// Annotate eligible libraries in place with vulnerability data,
    /// batching [`OSV_BATCH_SIZE`] queries per request. Returns the
    /// number of libraries queried.
    pub async fn annotate(&self, libraries: &mut [LibraryRecord]) -> usize {
        let eligible: Vec<usize> = libraries
            .iter()
            .enumerate()
            .filter(|(_, lib)| is_eligible(lib))
            .map(|(idx, _)| idx)
            .collect();

        for chunk in eligible.chunks(OSV_BATCH_SIZE) {
            let queries: Vec<OsvQuery> = chunk
                .iter()
                .map(|&idx| {
                    let lib = &libraries[idx];
                    OsvQuery {
                        package: OsvPackage {
                            ecosystem: lib
                                .ecosystem
                                .map(|e| e.as_str())
                                .unwrap_or_default()
                                .to_string(),
                            name: lib.name.clone(),
                        },
                        // Eligibility guarantees the version is present.
                        version: lib.version.clone().unwrap_or_default(),
                    }
                })
                .collect();

            let results = self.query_batch(&queries).await;
            for (&idx, result) in chunk.iter().zip(results) {
                apply_result(&mut libraries[idx], result);
            }
        }

        eligible.len()
    }
}

fn batch_error(len: usize, message: String) -> Vec<BatchItemResult> {
    debug!("OSV batch failed: {}", message);
    (0..len)
        .map(|_| BatchItemResult::Error(message.clone()))
        .collect()
}

/// Pair each query with its result; queries past the end of the response
/// array get an individual missing-result error.
fn align_results(query_count: usize, results: Vec<OsvBatchResult>) -> Vec<BatchItemResult> {
    let mut results = results.into_iter();
    (0..query_count)
        .map(|_| match results.next() {
            Some(result) => BatchItemResult::Vulns(result.vulns.unwrap_or_default()),
            None => BatchItemResult::Error("OSV response missing result.".to_string()),
        })
        .collect()
}

fn apply_result(lib: &mut LibraryRecord, result: BatchItemResult) {
    match result {
        BatchItemResult::Error(message) => {
            lib.vulnerability_error = Some(message);
        }
        BatchItemResult::Vulns(vulns) => {
            lib.vulnerability_count = vulns.len();
            lib.vulnerability_ids = vulns.iter().map(|v| v.id.clone()).collect();
            lib.vulnerabilities = if vulns.is_empty() {
                None
            } else {
                Some(
                    vulns
                        .iter()
                        .take(MAX_VULN_SUMMARIES)
                        .map(summarize)
                        .collect(),
                )
            };
        }
    }
}
