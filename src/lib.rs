//! renewal_watch library: HTML-form login and renewal scraping.
//!
//! Logs into a registrar account that speaks only HTML forms and
//! redirect-based cookies (no JSON API), extracts the renewals table from the
//! client area, and reports domains whose remaining days fall inside their
//! renewal window. Malformed table rows become per-row diagnostics instead of
//! failing the batch.
//!
//! # Example
//!
//! ```no_run
//! use renewal_watch::{run_check, Config};
//! use clap::Parser;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::parse_from([
//!     "renewal_watch",
//!     "--login-url", "https://my.example.com/clientarea.php",
//!     "--renewals-url", "https://my.example.com/domains.php?a=renewals",
//! ]);
//!
//! let report = run_check(&config).await?;
//! println!("{} of {} rows expiring soon", report.expiring, report.total_rows);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

mod certificates;
pub mod config;
mod cookies;
mod error_handling;
mod forms;
mod http;
pub mod initialization;
mod login;
mod notifier;
mod renewals;
mod session;
mod table;

// Re-export public API
pub use certificates::{fetch_certificate_expiry, CertificateError, CertificateExpiry};
pub use config::{Config, Credentials, LogFormat, LogLevel};
pub use cookies::CookieJar;
pub use error_handling::{HtmlApiError, InitializationError};
pub use forms::{extract_login_form, FormInput, LoginForm};
pub use http::{
    is_redirect, ReqwestTransport, ResponseKind, Transport, TransportRequest, TransportResponse,
};
pub use login::{login, Session};
pub use notifier::{certificate_message, expiry_message, Notifier, NotifierError};
pub use renewals::fetch_renewals;
pub use run::{run_certificate_check, run_check, CertificateReport, CheckReport};
pub use session::{follow_to_terminal_page, TerminalPage};
pub use table::{extract_renewal_table, RenewalRecord, RowOutcome};

// Internal run module (contains the check orchestration)
mod run {
    use anyhow::{Context, Result};
    use chrono::{TimeDelta, Utc};
    use log::{debug, error, info};
    use url::Url;

    use crate::certificates::{fetch_certificate_expiry, CertificateExpiry};
    use crate::config::{Config, Credentials};
    use crate::initialization::{init_notifier_client, init_transport};
    use crate::login::login;
    use crate::notifier::{certificate_message, expiry_message, Notifier};
    use crate::renewals::fetch_renewals;
    use crate::table::{RenewalRecord, RowOutcome};

    /// Results of one expiry check.
    #[derive(Debug, Clone)]
    pub struct CheckReport {
        /// Number of rows in the renewals table.
        pub total_rows: usize,
        /// Number of domains inside their renewal window.
        pub expiring: usize,
        /// Number of rows that failed to parse.
        pub row_errors: usize,
        /// Whether a notification was delivered.
        pub notified: bool,
    }

    /// Runs one login + renewals check + notification cycle.
    ///
    /// This is the main entry point for the library. It performs exactly one
    /// login attempt; retry and scheduling policy belong to the caller. A
    /// failed notification is logged but does not fail the check.
    ///
    /// # Errors
    ///
    /// Returns an error when credentials are missing from the environment,
    /// when a configured URL does not parse, or when the login/scrape
    /// pipeline fails (see `HtmlApiError`).
    pub async fn run_check(config: &Config) -> Result<CheckReport> {
        info!("=== Check domain expiration: task start ===");

        let credentials = Credentials::from_env()?;
        let login_url = Url::parse(&config.login_url).context("invalid --login-url")?;
        let renewals_url = Url::parse(&config.renewals_url).context("invalid --renewals-url")?;
        let notifier_url = Url::parse(&config.notifier_url).context("invalid --notifier-url")?;

        let transport = init_transport(config)?;
        let headers = vec![("user-agent".to_string(), config.user_agent.clone())];

        let session = login(
            &transport,
            &login_url,
            &credentials.username,
            &credentials.password,
            &headers,
            config.max_hops,
        )
        .await?;
        debug!("Got login cookie \"{}\"", session.cookies);

        let rows = fetch_renewals(&transport, &renewals_url, &session.cookies, &headers).await?;

        let mut records: Vec<RenewalRecord> = Vec::new();
        let mut row_errors: Vec<String> = Vec::new();
        for row in &rows {
            match row {
                RowOutcome::Record(record) => records.push(record.clone()),
                RowOutcome::Error(message) => row_errors.push(message.clone()),
            }
        }
        debug!("Got {} renewable domains", records.len());
        if !row_errors.is_empty() {
            error!("Renewal table has row errors: {}", row_errors.join("; "));
        }

        let expiring: Vec<RenewalRecord> = records
            .into_iter()
            .filter(|record| record.days_left <= record.min_renewal_days)
            .collect();
        if !expiring.is_empty() {
            info!(
                "Domains expiring soon: {}",
                expiring
                    .iter()
                    .map(|record| format!("{} in {} days", record.name, record.days_left))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mut notified = false;
        if let Some(message) = expiry_message(&expiring, &row_errors) {
            let notifier = Notifier::new(
                init_notifier_client(config)?,
                notifier_url,
                &credentials.notifier_key,
            )?;
            match notifier.send(&message).await {
                Ok(()) => {
                    debug!("Notification delivered");
                    notified = true;
                }
                Err(e) => error!("Notification request failed: {e}"),
            }
        }

        info!("=== Check domain expiration: task end ===");
        Ok(CheckReport {
            total_rows: rows.len(),
            expiring: expiring.len(),
            row_errors: row_errors.len(),
            notified,
        })
    }

    /// Results of one certificate-expiry check.
    #[derive(Debug, Clone)]
    pub struct CertificateReport {
        /// Number of hosts checked.
        pub checked: usize,
        /// Number of certificates expiring within the notification window.
        pub expiring: usize,
        /// Number of hosts whose lookup failed.
        pub host_errors: usize,
        /// Whether a notification was delivered.
        pub notified: bool,
    }

    /// Checks the TLS certificates of the configured hosts and notifies
    /// about those expiring within `--cert-notify-days`.
    ///
    /// Hosts are checked one after another; a failed lookup becomes a
    /// per-host error in the notification instead of aborting the batch. As
    /// with [`run_check`], a failed notification is logged but does not fail
    /// the check.
    ///
    /// # Errors
    ///
    /// Returns an error when no hosts are configured, when
    /// `--cert-notify-days` is not positive, when the notifier key is
    /// missing from the environment, or when `--notifier-url` does not
    /// parse.
    pub async fn run_certificate_check(config: &Config) -> Result<CertificateReport> {
        info!("=== Check SSL certificates expiration: task start ===");

        let credentials = Credentials::from_env()?;
        let notifier_url = Url::parse(&config.notifier_url).context("invalid --notifier-url")?;
        let hosts: Vec<&str> = config
            .cert_hosts
            .iter()
            .map(|host| host.trim())
            .filter(|host| !host.is_empty())
            .collect();
        if hosts.is_empty() {
            anyhow::bail!("--cert-hosts is empty, no hosts to check");
        }
        if config.cert_notify_days <= 0 {
            anyhow::bail!(
                "invalid --cert-notify-days value \"{}\", should be a positive number",
                config.cert_notify_days
            );
        }
        let edge = Utc::now().naive_utc() + TimeDelta::days(config.cert_notify_days);

        let mut expiring: Vec<CertificateExpiry> = Vec::new();
        let mut valid = 0usize;
        let mut host_errors: Vec<(String, String)> = Vec::new();
        for host in &hosts {
            match fetch_certificate_expiry(host).await {
                Ok(cert) if cert.valid_to <= edge => expiring.push(cert),
                Ok(_) => valid += 1,
                Err(e) => host_errors.push((host.to_string(), e.to_string())),
            }
        }

        if !host_errors.is_empty() {
            error!(
                "Got hosts errors: {}",
                host_errors
                    .iter()
                    .map(|(host, message)| format!("{host}: {message}"))
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }
        if expiring.is_empty() {
            info!("No certificates expiring ({valid} valid)");
        } else {
            info!(
                "Certificates expiring soon: {}",
                expiring
                    .iter()
                    .map(|cert| format!("{} on {}", cert.host, cert.valid_to.format("%Y-%m-%d")))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mut notified = false;
        if let Some(message) =
            certificate_message(&expiring, &host_errors, config.cert_notify_days)
        {
            let notifier = Notifier::new(
                init_notifier_client(config)?,
                notifier_url,
                &credentials.notifier_key,
            )?;
            match notifier.send(&message).await {
                Ok(()) => {
                    debug!("Notification delivered");
                    notified = true;
                }
                Err(e) => error!("Notification request failed: {e}"),
            }
        }

        info!("=== Check SSL certificates expiration: task end ===");
        Ok(CertificateReport {
            checked: hosts.len(),
            expiring: expiring.len(),
            host_errors: host_errors.len(),
            notified,
        })
    }
}
