//! TLS certificate expiry lookup.
//!
//! Connects to a host on port 443, completes a TLS handshake against the
//! webpki root store and reads the validity window out of the leaf
//! certificate. Certificates that are already invalid fail the handshake and
//! surface as a lookup error rather than an expiry record.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use log::debug;
use rustls::pki_types::ServerName;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use x509_parser::time::ASN1Time;

use crate::config::{TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS};

/// Errors from a single certificate lookup.
#[derive(Error, Debug)]
pub enum CertificateError {
    /// The host is not a valid TLS server name.
    #[error("invalid host name \"{host}\": {reason}")]
    InvalidHostName {
        /// The offending host.
        host: String,
        /// Why the name was rejected.
        reason: String,
    },

    /// The TCP connection could not be established.
    #[error("failed to connect to {host}:443: {reason}")]
    ConnectFailed {
        /// The target host.
        host: String,
        /// The underlying socket error.
        reason: String,
    },

    /// The TCP connection did not complete in time.
    #[error("TCP connection timeout for {host}:443 ({seconds}s)")]
    ConnectTimeout {
        /// The target host.
        host: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// The TLS handshake failed, including certificate validation failures.
    #[error("TLS handshake failed for {host}: {reason}")]
    HandshakeFailed {
        /// The target host.
        host: String,
        /// The underlying TLS error.
        reason: String,
    },

    /// The TLS handshake did not complete in time.
    #[error("TLS handshake timeout for {host} ({seconds}s)")]
    HandshakeTimeout {
        /// The target host.
        host: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// The server presented no certificate.
    #[error("no peer certificate presented by {host}")]
    NoCertificate {
        /// The target host.
        host: String,
    },

    /// The presented certificate could not be parsed.
    #[error("failed to parse certificate from {host}: {reason}")]
    Parse {
        /// The target host.
        host: String,
        /// What failed to parse.
        reason: String,
    },
}

/// Validity window of a host's leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExpiry {
    /// The host the certificate was fetched from.
    pub host: String,
    /// Certificate subject.
    pub subject: String,
    /// Certificate issuer.
    pub issuer: String,
    /// Start of the validity window (UTC).
    pub valid_from: NaiveDateTime,
    /// End of the validity window (UTC).
    pub valid_to: NaiveDateTime,
}

/// Fetches the leaf certificate of `host`:443 and returns its validity
/// window together with the subject and issuer names.
pub async fn fetch_certificate_expiry(host: &str) -> Result<CertificateExpiry, CertificateError> {
    debug!("Fetching TLS certificate for {host}");

    let server_name =
        ServerName::try_from(host.to_string()).map_err(|e| CertificateError::InvalidHostName {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let sock = match tokio::time::timeout(
        Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
        TcpStream::connect((host, 443)),
    )
    .await
    {
        Ok(Ok(sock)) => sock,
        Ok(Err(e)) => {
            return Err(CertificateError::ConnectFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(CertificateError::ConnectTimeout {
                host: host.to_string(),
                seconds: TCP_CONNECT_TIMEOUT_SECS,
            })
        }
    };

    let connector = TlsConnector::from(Arc::new(config));
    let tls_stream = match tokio::time::timeout(
        Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
        connector.connect(server_name, sock),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            return Err(CertificateError::HandshakeFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(CertificateError::HandshakeTimeout {
                host: host.to_string(),
                seconds: TLS_HANDSHAKE_TIMEOUT_SECS,
            })
        }
    };

    let no_certificate = || CertificateError::NoCertificate {
        host: host.to_string(),
    };
    let certs = tls_stream
        .get_ref()
        .1
        .peer_certificates()
        .ok_or_else(no_certificate)?;
    let leaf = certs.first().ok_or_else(no_certificate)?;

    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref()).map_err(|e| {
        CertificateError::Parse {
            host: host.to_string(),
            reason: e.to_string(),
        }
    })?;
    let tbs = &cert.tbs_certificate;

    let valid_from = parse_validity(&tbs.validity.not_before, host, "not_before")?;
    let valid_to = parse_validity(&tbs.validity.not_after, host, "not_after")?;
    debug!("Certificate for {host} valid until {valid_to}");

    Ok(CertificateExpiry {
        host: host.to_string(),
        subject: tbs.subject.to_string(),
        issuer: tbs.issuer.to_string(),
        valid_from,
        valid_to,
    })
}

fn parse_validity(
    time: &ASN1Time,
    host: &str,
    field: &str,
) -> Result<NaiveDateTime, CertificateError> {
    let rfc2822 = time.to_rfc2822().map_err(|e| CertificateError::Parse {
        host: host.to_string(),
        reason: format!("{field}: {e}"),
    })?;
    NaiveDateTime::parse_from_str(&rfc2822, "%a, %d %b %Y %H:%M:%S %z").map_err(|_| {
        CertificateError::Parse {
            host: host.to_string(),
            reason: format!("{field} is not a valid timestamp: {rfc2822}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_host_name_is_rejected_before_connecting() {
        let err = fetch_certificate_expiry("not a host name")
            .await
            .unwrap_err();
        match err {
            CertificateError::InvalidHostName { ref host, .. } => {
                assert_eq!(host, "not a host name");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_messages_name_the_host() {
        let err = CertificateError::ConnectTimeout {
            host: "www.example.com".to_string(),
            seconds: 10,
        };
        assert_eq!(
            err.to_string(),
            "TCP connection timeout for www.example.com:443 (10s)"
        );
    }
}
