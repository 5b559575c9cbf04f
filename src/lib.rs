//! libscan - library version scanner with OSV vulnerability lookup.
//!
//! This library scans a website for third-party script/style libraries by:
//! - Discovering pages via robots.txt and sitemap crawling
//! - Fetching page HTML and extracting script/stylesheet references
//! - Inferring library name and version from asset URLs (CDN heuristics)
//! - Querying the OSV database for known vulnerabilities per library@version
//!
//! # Example
//!
//! ```no_run
//! use libscan::config::ScanRequest;
//! use libscan::console::ConsoleOutput;
//! use libscan::scanner::Scanner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let scanner = Scanner::new(ConsoleOutput::silent());
//!     let outcome = scanner
//!         .scan(&ScanRequest::new("https://example.com"))
//!         .await
//!         .unwrap();
//!     println!("Found {} libraries", outcome.report.libraries.len());
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod console;
pub mod detect;
pub mod discovery;
pub mod extract;
pub mod fetch;
pub mod osv;
pub mod report;
pub mod scanner;
pub mod scope;
pub mod types;

pub use config::{Config, ScanRequest};
pub use console::ConsoleOutput;
pub use scanner::Scanner;
pub use types::{
    DetectedLibrary, Ecosystem, LibraryRecord, LibscanError, PageError, PageSummary, Result,
    ScanOutcome, ScanReport, VulnSummary,
};
