//! HTTP transport abstraction.
//!
//! The pipeline never follows redirects on its own and never talks to an
//! ambient global client: every operation receives a [`Transport`] capability
//! and issues single round-trips through it. Redirect handling, cookie
//! tracking and retry policy all belong to the callers.

use std::future::Future;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{ClientBuilder, Method};
use url::Url;

use crate::error_handling::HtmlApiError;

/// Statuses treated as redirects when walking a chain manually.
const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Returns true for the redirect status codes {301, 302, 303, 307, 308}.
///
/// `None` (a response with no parsable status) is never a redirect.
pub fn is_redirect(status: Option<u16>) -> bool {
    status.is_some_and(|status| REDIRECT_STATUSES.contains(&status))
}

/// Coarse classification of a response, so expected intermediate states
/// (redirects) are not conflated with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// 2xx.
    Success,
    /// One of {301, 302, 303, 307, 308}.
    Redirect,
    /// Anything else.
    Other,
}

impl ResponseKind {
    /// Classifies a status code.
    pub fn classify(status: u16) -> Self {
        if is_redirect(Some(status)) {
            ResponseKind::Redirect
        } else if (200..300).contains(&status) {
            ResponseKind::Success
        } else {
            ResponseKind::Other
        }
    }
}

/// A single outbound HTTP round-trip: method, absolute URL, headers sent
/// verbatim, and an optional raw body.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL; the scheme selects plain vs TLS transport.
    pub url: Url,
    /// Headers in send order, case preserved.
    pub headers: Vec<(String, String)>,
    /// Optional raw request body.
    pub body: Option<String>,
}

impl TransportRequest {
    /// A GET request with the given headers.
    pub fn get(url: Url, headers: Vec<(String, String)>) -> Self {
        TransportRequest {
            method: Method::GET,
            url,
            headers,
            body: None,
        }
    }

    /// A POST request with the given headers and raw body.
    pub fn post(url: Url, headers: Vec<(String, String)>, body: String) -> Self {
        TransportRequest {
            method: Method::POST,
            url,
            headers,
            body: Some(body),
        }
    }
}

/// A fetched response with its body already drained into a string.
///
/// The body may be empty for non-content responses (redirects). Header lookup
/// is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Full response body.
    pub body: String,
}

impl TransportResponse {
    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// All `Set-Cookie` values carried by this response, in header order.
    pub fn set_cookie_values(&self) -> Vec<String> {
        self.headers
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// The media type of the response: the `Content-Type` value truncated at
    /// its first `;` and trimmed, e.g. `text/html` for
    /// `text/html; charset=utf-8`.
    pub fn content_type(&self) -> Option<&str> {
        self.header(reqwest::header::CONTENT_TYPE.as_str())
            .and_then(|value| value.split(';').next())
            .map(str::trim)
    }

    /// Classifies this response's status.
    pub fn kind(&self) -> ResponseKind {
        ResponseKind::classify(self.status)
    }
}

/// Capability for issuing single HTTP round-trips.
///
/// Implementations must not follow redirects; callers depend on seeing every
/// 3xx response themselves. Passed as a parameter so tests can substitute a
/// scripted transport.
pub trait Transport {
    /// Issues one request and drains the response body.
    ///
    /// Transport-level failures (DNS, refused connection, socket errors) map
    /// to [`HtmlApiError::Transport`]; a fetched response is returned as-is
    /// whatever its status.
    fn request(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, HtmlApiError>> + Send;
}

/// [`Transport`] backed by a `reqwest` client with redirects disabled.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, HtmlApiError> {
        let url = request.url.to_string();
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(|source| HtmlApiError::Transport {
            url: url.clone(),
            source,
        })?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|source| HtmlApiError::Transport { url, source })?;
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_redirect_exact_status_set() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(Some(status)), "{status} should be a redirect");
        }
        for status in [200, 204, 300, 304, 305, 306, 309, 400, 404, 500] {
            assert!(!is_redirect(Some(status)), "{status} is not a redirect");
        }
    }

    #[test]
    fn test_is_redirect_none_is_false() {
        assert!(!is_redirect(None));
    }

    #[test]
    fn test_response_kind_classification() {
        assert_eq!(ResponseKind::classify(200), ResponseKind::Success);
        assert_eq!(ResponseKind::classify(299), ResponseKind::Success);
        assert_eq!(ResponseKind::classify(302), ResponseKind::Redirect);
        assert_eq!(ResponseKind::classify(304), ResponseKind::Other);
        assert_eq!(ResponseKind::classify(404), ResponseKind::Other);
        assert_eq!(ResponseKind::classify(500), ResponseKind::Other);
    }

    #[test]
    fn test_content_type_truncated_at_parameters() {
        let response = testing::response(
            200,
            &[("content-type", "text/html; charset=utf-8")],
            "<html></html>",
        );
        assert_eq!(response.content_type(), Some("text/html"));
    }

    #[test]
    fn test_content_type_missing() {
        let response = testing::response(204, &[], "");
        assert_eq!(response.content_type(), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = testing::response(302, &[("Location", "/next")], "");
        assert_eq!(response.header("location"), Some("/next"));
    }

    #[test]
    fn test_set_cookie_values_preserve_order() {
        let response = testing::response(
            302,
            &[("set-cookie", "A=1; path=/"), ("set-cookie", "B=2; HttpOnly")],
            "",
        );
        assert_eq!(response.set_cookie_values(), vec!["A=1; path=/", "B=2; HttpOnly"]);
    }
}
