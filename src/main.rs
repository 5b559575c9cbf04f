//! libscan - library version scanner with OSV vulnerability lookup.
//!
//! CLI entry point.

use clap::Parser;
use libscan::{Config, ConsoleOutput, Scanner};
use std::fs;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = if config.verbose {
        EnvFilter::new("libscan=debug,info")
    } else {
        EnvFilter::new("libscan=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let request = match config.to_request() {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to build scan request: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let console = ConsoleOutput::new(config.verbose, config.json, config.quiet);
    let mut scanner = Scanner::new(console);
    if let Some(ref user_agent) = config.user_agent {
        scanner = scanner.with_user_agent(user_agent.clone());
    }

    let outcome = match scanner.scan(&request).await {
        Ok(o) => o,
        Err(e) => {
            error!("Scan failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Emit the JSON report to stdout and/or a file.
    if config.json {
        let json = serde_json::to_string_pretty(&outcome).unwrap_or_default();
        if let Some(ref output_path) = config.output {
            if let Err(e) = fs::write(output_path, &json) {
                error!("Failed to write output file: {}", e);
                return ExitCode::FAILURE;
            }
        } else {
            println!("{}", json);
        }
    } else if let Some(ref output_path) = config.output {
        // Write JSON to file even in non-JSON mode
        let json = serde_json::to_string_pretty(&outcome).unwrap_or_default();
        if let Err(e) = fs::write(output_path, &json) {
            error!("Failed to write output file: {}", e);
            return ExitCode::FAILURE;
        }
        eprintln!("Report written to: {}", output_path.display());
    }

    let vulnerable = outcome
        .report
        .libraries
        .iter()
        .filter(|l| l.vulnerability_count > 0)
        .count();

    if vulnerable > 0 && !config.json {
        eprintln!("\n{} libraries with known vulnerabilities found!", vulnerable);
    }

    ExitCode::SUCCESS
}
