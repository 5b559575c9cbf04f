//! Core types and errors for the library version scanner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during scanning.
///
/// Note that per-page and per-batch failures are *not* errors: they are
/// recorded in the report as [`PageError`]s or per-library vulnerability
/// errors. This enum covers request validation and setup failures only.
#[derive(Error, Debug)]
pub enum LibscanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, LibscanError>;

/// Package ecosystem a detected library belongs to.
///
/// Only npm is detected by the current heuristics; the enum exists so the
/// OSV query side stays ecosystem-agnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    #[serde(rename = "npm")]
    Npm,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
        }
    }
}

/// Kind of page asset a reference was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Script,
    Style,
}

/// A script/stylesheet reference extracted from one page, before resolution.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Raw attribute value (possibly relative).
    pub url: String,
    pub kind: AssetKind,
}

/// A single library observation from one asset on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLibrary {
    pub ecosystem: Option<Ecosystem>,
    pub name: String,
    pub version: Option<String>,
    /// Absolute URL of the asset the detection came from.
    pub source_url: String,
}

/// Summary of one vulnerability-database record attached to a library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VulnSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
}

/// Aggregated record for one library identity (`ecosystem:name@version`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRecord {
    pub ecosystem: Option<Ecosystem>,
    pub name: String,
    pub version: Option<String>,
    /// Pages the library was seen on (capped subset).
    pub pages: Vec<String>,
    /// Asset URLs the library was detected from (capped subset).
    pub sources: Vec<String>,
    pub occurrences: usize,
    /// Zero when the library was never queried; check
    /// `vulnerability_error` before trusting a zero.
    pub vulnerability_count: usize,
    pub vulnerability_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<VulnSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerability_error: Option<String>,
}

/// One page that failed to fetch or was skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageError {
    pub url: String,
    /// HTTP status for non-2xx / skipped responses, `None` for
    /// timeouts and transport errors.
    pub status: Option<u16>,
    pub error: String,
}

/// Page counts for one scan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSummary {
    /// Pages discovered after scope filtering, before truncation.
    pub discovered: usize,
    /// Pages actually fetched (after the max-pages cap).
    pub scanned: usize,
    pub ok: usize,
    pub failed: usize,
}

/// Terminal output of one scan invocation. Never mutated after assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub pages: PageSummary,
    pub page_errors: Vec<PageError>,
    /// Sorted: vulnerability count desc, occurrences desc, name@version asc.
    pub libraries: Vec<LibraryRecord>,
}

/// A scan report plus its diagnostic transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    #[serde(flatten)]
    pub report: ScanReport,
    /// Human-readable phase-by-phase transcript.
    pub log: String,
    pub duration_secs: f64,
}

/// Configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 12_000,
            user_agent: "Mozilla/5.0 (compatible; libscan/0.1)".to_string(),
        }
    }
}
