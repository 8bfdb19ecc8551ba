//! Bounded redirect walk to a terminal HTML page.
//!
//! The login entry point answers with a chain of redirects that hand out the
//! session cookie along the way. The walker follows the chain manually,
//! sending the current jar on every hop, until it reaches a terminal HTML
//! page or runs out of hop budget.

use log::debug;
use url::Url;

use crate::cookies::CookieJar;
use crate::error_handling::HtmlApiError;
use crate::http::{is_redirect, Transport, TransportRequest};

/// Statuses accepted as a terminal page.
const SUCCESS_STATUSES: [u16; 2] = [200, 304];

/// The terminal page of a redirect chain: where the walk ended, the cookie
/// jar in effect there, and the page body.
#[derive(Debug, Clone)]
pub struct TerminalPage {
    /// The URL of the terminal page.
    pub address: Url,
    /// The cookies of the last response that set any.
    pub cookies: CookieJar,
    /// The page HTML.
    pub html: String,
}

/// Follows redirects from `start_url` until a terminal HTML page is reached.
///
/// Each hop GETs the current URL with `headers` plus the serialized jar as
/// the `Cookie` header. A response carrying `Set-Cookie` *replaces* the jar
/// with its own cookies; cookies are never merged across hops. A redirect
/// updates the URL's path from `Location` (same host); a redirect without
/// `Location` retries the same URL. A 200/304 with `text/html` content ends
/// the walk; any other content type fails with
/// [`HtmlApiError::UnsupportedContentType`], any other status with
/// [`HtmlApiError::UnexpectedStatus`]. After `max_hops` requests without a
/// terminal page the walk fails with [`HtmlApiError::MaxRequestsReached`].
pub async fn follow_to_terminal_page<T: Transport>(
    transport: &T,
    start_url: &Url,
    headers: &[(String, String)],
    max_hops: usize,
) -> Result<TerminalPage, HtmlApiError> {
    let mut url = start_url.clone();
    let mut jar = CookieJar::default();

    for _ in 0..max_hops {
        let mut request_headers = headers.to_vec();
        request_headers.push(("cookie".to_string(), jar.serialize()));
        let response = transport
            .request(TransportRequest::get(url.clone(), request_headers))
            .await?;

        let set_cookie = response.set_cookie_values();
        if !set_cookie.is_empty() {
            jar = CookieJar::parse(&set_cookie);
        }

        if is_redirect(Some(response.status)) {
            if let Some(location) = response.header("location") {
                debug!("redirect {} -> {}", url, location);
                url.set_path(location);
            }
        } else if SUCCESS_STATUSES.contains(&response.status) {
            if response.content_type() == Some("text/html") {
                return Ok(TerminalPage {
                    address: url,
                    cookies: jar,
                    html: response.body,
                });
            }
            return Err(HtmlApiError::UnsupportedContentType {
                status: response.status,
                url: url.to_string(),
                content_type: response.content_type().map(str::to_string),
            });
        } else {
            return Err(HtmlApiError::UnexpectedStatus {
                status: response.status,
                url: url.to_string(),
            });
        }
    }

    Err(HtmlApiError::MaxRequestsReached { max_hops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{response, MockTransport};

    const MAX_HOPS: usize = 4;

    fn start_url() -> Url {
        Url::parse("https://my.example.com/clientarea.php").unwrap()
    }

    fn headers() -> Vec<(String, String)> {
        vec![("user-agent".to_string(), "test-agent".to_string())]
    }

    #[tokio::test]
    async fn test_two_hop_chain_reaches_terminal_page() {
        let transport = MockTransport::new(vec![
            response(302, &[("location", "/auth")], ""),
            response(
                302,
                &[("location", "/auth"), ("set-cookie", "WHMCS=abc; path=/")],
                "",
            ),
            response(200, &[("content-type", "text/html; charset=utf-8")], "<html/>"),
        ]);

        let page = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 3, "initial + two redirects");
        assert_eq!(page.address.path(), "/auth");
        assert_eq!(page.cookies.serialize(), "WHMCS=abc");
        assert_eq!(page.html, "<html/>");

        // The cookie received on hop 2 must be sent on hop 3.
        let hop3_cookie = requests[2]
            .headers
            .iter()
            .find(|(name, _)| name == "cookie")
            .map(|(_, value)| value.clone());
        assert_eq!(hop3_cookie.as_deref(), Some("WHMCS=abc"));
    }

    #[tokio::test]
    async fn test_latest_set_cookie_replaces_jar() {
        let transport = MockTransport::new(vec![
            response(302, &[("location", "/a"), ("set-cookie", "First=1")], ""),
            response(302, &[("location", "/b"), ("set-cookie", "Second=2")], ""),
            response(200, &[("content-type", "text/html")], "ok"),
        ]);

        let page = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap();
        assert_eq!(page.cookies.serialize(), "Second=2");
    }

    #[tokio::test]
    async fn test_cookieless_redirect_carries_jar_forward() {
        let transport = MockTransport::new(vec![
            response(302, &[("location", "/a"), ("set-cookie", "Keep=me")], ""),
            response(302, &[("location", "/b")], ""),
            response(200, &[("content-type", "text/html")], "ok"),
        ]);

        let page = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap();
        assert_eq!(page.cookies.serialize(), "Keep=me");
    }

    #[tokio::test]
    async fn test_redirect_without_location_retries_same_url() {
        let transport = MockTransport::new(vec![
            response(302, &[], ""),
            response(200, &[("content-type", "text/html")], "ok"),
        ]);

        let page = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap();
        assert_eq!(page.address, start_url());
        let requests = transport.requests();
        assert_eq!(requests[0].url, requests[1].url);
    }

    #[tokio::test]
    async fn test_max_hops_exhausted() {
        let transport = MockTransport::new(vec![
            response(302, &[("location", "/loop")], ""),
            response(302, &[("location", "/loop")], ""),
            response(302, &[("location", "/loop")], ""),
            response(302, &[("location", "/loop")], ""),
        ]);

        let err = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap_err();
        match err {
            HtmlApiError::MaxRequestsReached { max_hops } => assert_eq!(max_hops, MAX_HOPS),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.requests().len(), MAX_HOPS);
    }

    #[tokio::test]
    async fn test_non_html_terminal_page_is_rejected() {
        let transport = MockTransport::new(vec![response(
            200,
            &[("content-type", "application/json")],
            "{}",
        )]);

        let err = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap_err();
        match err {
            HtmlApiError::UnsupportedContentType {
                status,
                content_type,
                ..
            } => {
                assert_eq!(status, 200);
                assert_eq!(content_type.as_deref(), Some("application/json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_modified_is_accepted_as_terminal() {
        let transport = MockTransport::new(vec![response(
            304,
            &[("content-type", "text/html")],
            "",
        )]);

        let page = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap();
        assert_eq!(page.html, "");
    }

    #[tokio::test]
    async fn test_unexpected_status_is_fatal() {
        let transport = MockTransport::new(vec![response(503, &[], "down")]);

        let err = follow_to_terminal_page(&transport, &start_url(), &headers(), MAX_HOPS)
            .await
            .unwrap_err();
        match err {
            HtmlApiError::UnexpectedStatus { status, url } => {
                assert_eq!(status, 503);
                assert!(url.contains("my.example.com"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
