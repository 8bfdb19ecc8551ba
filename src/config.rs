//! Constants, command-line options and environment credentials.

use clap::{Parser, ValueEnum};

// constants (used as defaults)

/// Redirect hop budget for reaching the login form page.
///
/// The login entry point normally answers with two redirects before the form
/// page, so four requests leave headroom without letting a misbehaving server
/// loop forever. Overridable via `--max-hops`.
pub const MAX_LOGIN_HOPS: usize = 4;

/// Per-request timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// TCP connect timeout for certificate lookups, in seconds.
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// TLS handshake timeout for certificate lookups, in seconds.
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Default notification lead time for expiring certificates, in days.
pub const DEFAULT_CERT_NOTIFY_DAYS: i64 = 1;

/// Header label used to locate the renewals table.
///
/// The renewals page carries no stable id or class on its table, so the
/// extractor matches this visible `<th>` text instead.
pub const RENEWALS_TABLE_LABEL: &str = "Days Until Expiry";

/// Default notification webhook endpoint.
pub const DEFAULT_NOTIFIER_URL: &str = "https://alarmerbot.ru";

/// Default User-Agent string for HTTP requests.
///
/// Uses a generic Chrome-like string without a specific version number to
/// avoid becoming outdated. Users can override this via `--user-agent`.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Environment variable names for secrets. Secrets stay out of argv so they
// never show up in process listings; a .env file is honored.

/// Account username variable.
pub const USERNAME_ENV: &str = "RENEWAL_WATCH_USERNAME";
/// Account password variable.
pub const PASSWORD_ENV: &str = "RENEWAL_WATCH_PASSWORD";
/// Notification webhook API key variable.
pub const NOTIFIER_KEY_ENV: &str = "RENEWAL_WATCH_ALARMER_KEY";

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages (default).
    Info,
    /// Debug detail, including session cookies.
    Debug,
    /// Everything.
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: human-readable format (default)
/// - `Json`: structured JSON lines for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Plain,
    /// One JSON object per line.
    Json,
}

/// Command-line options and configuration.
///
/// Everything but the two page URLs has a default; credentials come from the
/// environment (see [`Credentials`]), never from flags.
///
/// # Examples
///
/// ```bash
/// renewal_watch \
///     --login-url https://my.example.com/clientarea.php \
///     --renewals-url 'https://my.example.com/domains.php?a=renewals'
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "renewal_watch",
    about = "Logs into a registrar's HTML client area and reports domains nearing expiry."
)]
pub struct Config {
    /// Login page URL (the registrar's client area)
    #[arg(long)]
    pub login_url: String,

    /// Renewals listing URL
    #[arg(long)]
    pub renewals_url: String,

    /// Notification webhook endpoint
    #[arg(long, default_value = DEFAULT_NOTIFIER_URL)]
    pub notifier_url: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Redirect hop budget for reaching the login form page
    #[arg(long, default_value_t = MAX_LOGIN_HOPS)]
    pub max_hops: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Hosts whose TLS certificates are checked for upcoming expiry
    /// (comma-separated; empty skips the certificate check)
    #[arg(long, value_delimiter = ',', value_name = "HOSTS")]
    pub cert_hosts: Vec<String>,

    /// Days before certificate expiry that trigger a notification
    #[arg(long, default_value_t = DEFAULT_CERT_NOTIFY_DAYS)]
    pub cert_notify_days: i64,
}

/// Secrets loaded from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Notification webhook API key.
    pub notifier_key: String,
}

impl Credentials {
    /// Loads credentials from the environment, treating unset and empty
    /// variables the same. All missing variables are reported at once.
    pub fn from_env() -> anyhow::Result<Self> {
        Credentials::from_values(
            std::env::var(USERNAME_ENV).ok(),
            std::env::var(PASSWORD_ENV).ok(),
            std::env::var(NOTIFIER_KEY_ENV).ok(),
        )
    }

    fn from_values(
        username: Option<String>,
        password: Option<String>,
        notifier_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut errors: Vec<String> = Vec::new();
        let mut require = |value: Option<String>, name: &str| match value {
            Some(value) if !value.is_empty() => value,
            _ => {
                errors.push(format!("{name} is empty"));
                String::new()
            }
        };

        let username = require(username, USERNAME_ENV);
        let password = require(password, PASSWORD_ENV);
        let notifier_key = require(notifier_key, NOTIFIER_KEY_ENV);

        if !errors.is_empty() {
            anyhow::bail!("{}", errors.join("; "));
        }
        Ok(Credentials {
            username,
            password,
            notifier_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Config::command().debug_assert();
    }

    #[test]
    fn test_cert_hosts_are_comma_separated() {
        let config = Config::parse_from([
            "renewal_watch",
            "--login-url",
            "https://my.example.com/clientarea.php",
            "--renewals-url",
            "https://my.example.com/domains.php?a=renewals",
            "--cert-hosts",
            "a.example.com,b.example.com",
        ]);
        assert_eq!(config.cert_hosts, vec!["a.example.com", "b.example.com"]);
        assert_eq!(config.cert_notify_days, 1);
    }

    #[test]
    fn test_cert_hosts_default_to_empty() {
        let config = Config::parse_from([
            "renewal_watch",
            "--login-url",
            "https://my.example.com/clientarea.php",
            "--renewals-url",
            "https://my.example.com/domains.php?a=renewals",
        ]);
        assert!(config.cert_hosts.is_empty());
    }

    #[test]
    fn test_credentials_all_present() {
        let credentials = Credentials::from_values(
            Some("alice".to_string()),
            Some("hunter2".to_string()),
            Some("key".to_string()),
        )
        .unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "hunter2");
        assert_eq!(credentials.notifier_key, "key");
    }

    #[test]
    fn test_credentials_missing_are_reported_together() {
        let err = Credentials::from_values(None, Some(String::new()), Some("key".to_string()))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("RENEWAL_WATCH_USERNAME is empty"));
        assert!(message.contains("RENEWAL_WATCH_PASSWORD is empty"));
        assert!(!message.contains("ALARMER"));
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let err = Credentials::from_values(
            Some("alice".to_string()),
            Some("pw".to_string()),
            Some(String::new()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("RENEWAL_WATCH_ALARMER_KEY is empty"));
    }
}
