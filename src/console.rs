//! Colored console output for scan progress and results.

use crate::types::{LibraryRecord, ScanOutcome};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Console output handler with colors and formatting.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleOutput {
    verbose: bool,
    json_mode: bool,
    quiet: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool, json_mode: bool, quiet: bool) -> Self {
        Self {
            verbose,
            json_mode,
            quiet,
        }
    }

    /// Output handler that prints nothing; for embedding the scanner in
    /// another program.
    pub fn silent() -> Self {
        Self::new(false, true, true)
    }

    /// Print scan start message.
    pub fn print_scan_start(&self, target: &str) {
        if self.json_mode || self.quiet {
            return;
        }

        println!(
            "{} Scanning: {}",
            "[*]".bright_blue(),
            target.bright_white()
        );
    }

    /// Print scan progress (only in verbose mode).
    pub fn print_progress(&self, message: &str) {
        if self.json_mode || !self.verbose {
            return;
        }

        println!("{} {}", "[.]".dimmed(), message.dimmed());
    }

    /// Print info message.
    pub fn print_info(&self, message: &str) {
        if self.json_mode || self.quiet {
            return;
        }

        println!("{} {}", "[*]".bright_blue(), message);
    }

    /// Print one library line from the sorted report.
    pub fn print_library(&self, lib: &LibraryRecord) {
        if self.json_mode || self.quiet {
            return;
        }

        let identity = format!(
            "{}@{}",
            lib.name,
            lib.version.as_deref().unwrap_or("unknown")
        );

        let status = if let Some(ref error) = lib.vulnerability_error {
            format!("lookup failed: {}", error).yellow()
        } else if lib.vulnerability_count > 0 {
            format!("{} known vulnerabilities", lib.vulnerability_count)
                .red()
                .bold()
        } else {
            "no known vulnerabilities".green()
        };

        println!(
            "  {} {} ({} occurrence{}) - {}",
            "-".bright_cyan(),
            identity.bright_white(),
            lib.occurrences,
            if lib.occurrences == 1 { "" } else { "s" },
            status
        );

        if self.verbose {
            for id in &lib.vulnerability_ids {
                println!("      {}", id.dimmed());
            }
        }
    }

    /// Print scan summary.
    pub fn print_summary(&self, target: &str, outcome: &ScanOutcome) {
        if self.json_mode {
            return;
        }

        let vulnerable = outcome
            .report
            .libraries
            .iter()
            .filter(|l| l.vulnerability_count > 0)
            .count();

        if self.quiet && vulnerable == 0 {
            return;
        }

        println!();
        println!("{}", "=== Scan Summary ===".bright_cyan());
        println!("  Target:     {}", target);
        println!("  Duration:   {:.2}s", outcome.duration_secs);
        println!(
            "  Pages:      {} discovered, {} scanned, {} ok, {} failed",
            outcome.report.pages.discovered,
            outcome.report.pages.scanned,
            outcome.report.pages.ok,
            outcome.report.pages.failed
        );
        println!("  Libraries:  {}", outcome.report.libraries.len());

        if vulnerable > 0 {
            println!(
                "  {}",
                format!("LIBRARIES WITH KNOWN VULNERABILITIES: {}", vulnerable)
                    .red()
                    .bold()
            );
        } else {
            println!("  {}", "No known vulnerabilities found.".green());
        }

        if !outcome.report.libraries.is_empty() {
            println!();
            for lib in &outcome.report.libraries {
                self.print_library(lib);
            }
        }

        if !outcome.report.page_errors.is_empty() && self.verbose {
            println!();
            println!("{}", "Page errors:".yellow());
            for err in &outcome.report.page_errors {
                let status = err
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("  - [{}] {} ({})", status, err.url.dimmed(), err.error);
            }
        }

        println!();
    }

    /// Create a progress bar for the page-fetch phase.
    pub fn create_progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.json_mode || self.quiet {
            return None;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message(message.to_string());
        Some(pb)
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_output_creation() {
        let output = ConsoleOutput::new(true, false, false);
        assert!(output.verbose);
        assert!(!output.json_mode);
    }

    #[test]
    fn test_silent_suppresses_progress_bar() {
        let output = ConsoleOutput::silent();
        assert!(output.create_progress_bar(10, "fetching").is_none());
    }
}
