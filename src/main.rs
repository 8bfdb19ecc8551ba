//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `renewal_watch` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use renewal_watch::initialization::init_logger_with;
use renewal_watch::{run_certificate_check, run_check, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists). This allows
    // setting the account credentials without exporting them manually.
    let _ = dotenvy::dotenv();

    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Run the renewal check using the library
    match run_check(&config).await {
        Ok(report) => {
            println!(
                "Checked {} renewal row{}: {} expiring soon, {} row error{}{}",
                report.total_rows,
                if report.total_rows == 1 { "" } else { "s" },
                report.expiring,
                report.row_errors,
                if report.row_errors == 1 { "" } else { "s" },
                if report.notified {
                    " - notification sent"
                } else {
                    ""
                }
            );
        }
        Err(e) => {
            eprintln!("renewal_watch error: {:#}", e);
            process::exit(1);
        }
    }

    // Run the certificate check when hosts were configured
    if !config.cert_hosts.is_empty() {
        match run_certificate_check(&config).await {
            Ok(report) => {
                println!(
                    "Checked {} certificate{}: {} expiring soon, {} host error{}{}",
                    report.checked,
                    if report.checked == 1 { "" } else { "s" },
                    report.expiring,
                    report.host_errors,
                    if report.host_errors == 1 { "" } else { "s" },
                    if report.notified {
                        " - notification sent"
                    } else {
                        ""
                    }
                );
            }
            Err(e) => {
                eprintln!("renewal_watch error: {:#}", e);
                process::exit(1);
            }
        }
    }

    Ok(())
}
