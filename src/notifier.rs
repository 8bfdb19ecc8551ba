//! Push-notification delivery and message formatting.
//!
//! The notification service is a plain GET webhook taking an API key and a
//! message as query parameters and answering 200 on acceptance.

use thiserror::Error;
use url::Url;

use crate::certificates::CertificateExpiry;
use crate::table::RenewalRecord;

/// Leading line of every notification, used by the receiving channel for
/// filtering.
const MESSAGE_HEADER: &str = "Checking expired #domains";

/// Leading line of certificate-expiry notifications, same filtering role as
/// [`MESSAGE_HEADER`].
const CERT_MESSAGE_HEADER: &str = "Checking the expiration date of #certificates";

/// Errors from notification delivery.
#[derive(Error, Debug)]
pub enum NotifierError {
    /// The API key is empty; the notifier cannot be constructed.
    #[error("the notifier API key is empty, unable to send notifications")]
    EmptyApiKey,

    /// The webhook request itself failed.
    #[error("notification request to \"{url}\" failed: {source}")]
    Request {
        /// The webhook endpoint.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The webhook answered with something other than 200.
    #[error("notification endpoint \"{url}\" returned status code \"{status}\"")]
    UnexpectedStatus {
        /// The webhook endpoint.
        url: String,
        /// The status the endpoint returned.
        status: u16,
    },
}

/// Webhook client for the notification endpoint.
#[derive(Debug)]
pub struct Notifier {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl Notifier {
    /// Builds the notifier. Fails with [`NotifierError::EmptyApiKey`] when
    /// `api_key` is empty.
    pub fn new(client: reqwest::Client, endpoint: Url, api_key: &str) -> Result<Self, NotifierError> {
        if api_key.is_empty() {
            return Err(NotifierError::EmptyApiKey);
        }
        Ok(Notifier {
            client,
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    /// Sends one message: GET `<endpoint>?key=<key>&message=<message>`.
    pub async fn send(&self, message: &str) -> Result<(), NotifierError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("message", message);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| NotifierError::Request {
                url: self.endpoint.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(NotifierError::UnexpectedStatus {
                url: self.endpoint.to_string(),
                status,
            });
        }
        Ok(())
    }
}

/// Formats the notification body for a check result: a block listing the
/// expiring domains and a block listing row-level extraction errors, joined
/// by blank lines under [`MESSAGE_HEADER`]. Returns `None` when there is
/// nothing to report.
pub fn expiry_message(expiring: &[RenewalRecord], row_errors: &[String]) -> Option<String> {
    if expiring.is_empty() && row_errors.is_empty() {
        return None;
    }

    let mut blocks = vec![MESSAGE_HEADER.to_string()];
    if !expiring.is_empty() {
        let listing = expiring
            .iter()
            .map(|record| format!("{} expires in {} days", record.name, record.days_left))
            .collect::<Vec<_>>()
            .join("\n");
        blocks.push(format!(
            "The following domains will expire soon:\n\n{listing}"
        ));
    }
    if !row_errors.is_empty() {
        blocks.push(format!(
            "Errors when checking domains:\n\n{}",
            row_errors.join("\n")
        ));
    }
    Some(blocks.join("\n\n"))
}

/// Formats the notification body for a certificate check: a block listing the
/// certificates expiring within `notify_days` and a block listing per-host
/// lookup errors, joined by blank lines under [`CERT_MESSAGE_HEADER`].
/// Returns `None` when there is nothing to report.
pub fn certificate_message(
    expiring: &[CertificateExpiry],
    host_errors: &[(String, String)],
    notify_days: i64,
) -> Option<String> {
    if expiring.is_empty() && host_errors.is_empty() {
        return None;
    }

    let mut blocks = vec![CERT_MESSAGE_HEADER.to_string()];
    if !expiring.is_empty() {
        let listing = expiring
            .iter()
            .map(|cert| {
                format!(
                    "{}: {}\nexpires {}",
                    cert.issuer,
                    cert.subject,
                    cert.valid_to.format("%Y-%m-%d")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        blocks.push(format!(
            "The following certificates expire in {notify_days} days:\n\n{listing}"
        ));
    }
    if !host_errors.is_empty() {
        let listing = host_errors
            .iter()
            .map(|(host, message)| format!("{host}: {message}"))
            .collect::<Vec<_>>()
            .join("\n");
        blocks.push(format!("Got hosts errors:\n\n{listing}"));
    }
    Some(blocks.join("\n\n"))
}
