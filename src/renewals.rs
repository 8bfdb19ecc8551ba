//! Authenticated fetch of the renewals listing.

use url::Url;

use crate::config::RENEWALS_TABLE_LABEL;
use crate::error_handling::HtmlApiError;
use crate::http::{ResponseKind, Transport, TransportRequest};
use crate::table::{extract_renewal_table, RowOutcome};

/// Fetches the renewals page with the session cookie and extracts its table.
///
/// The transport never follows redirects, so anything but a 2xx answer
/// (including a redirect back to the login page when the session expired) is
/// an [`HtmlApiError::UnexpectedStatus`]. Row-level parse failures come back
/// as [`RowOutcome::Error`] elements, never as an `Err`.
pub async fn fetch_renewals<T: Transport>(
    transport: &T,
    url: &Url,
    cookies: &str,
    headers: &[(String, String)],
) -> Result<Vec<RowOutcome>, HtmlApiError> {
    let mut request_headers = headers.to_vec();
    request_headers.push(("cookie".to_string(), cookies.to_string()));

    let response = transport
        .request(TransportRequest::get(url.clone(), request_headers))
        .await?;

    match response.kind() {
        ResponseKind::Success => extract_renewal_table(&response.body, RENEWALS_TABLE_LABEL, url),
        _ => Err(HtmlApiError::UnexpectedStatus {
            status: response.status,
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{response, MockTransport};

    fn renewals_url() -> Url {
        Url::parse("https://my.example.com/domains.php?a=renewals").unwrap()
    }

    const RENEWALS_PAGE: &str = r#"<html><body><table>
        <thead><tr>
            <th>Domain</th><th>Status</th><th>Days Until Expiry</th>
            <th>Minimum Renewal</th><th>Options</th>
        </tr></thead>
        <tbody><tr>
            <td>example.tk</td>
            <td>Active</td>
            <td>5 Days</td>
            <td>14 Days</td>
            <td><a href="domains.php?a=renewdomain&domain=42">Renew</a></td>
        </tr></tbody>
    </table></body></html>"#;

    #[tokio::test]
    async fn test_fetch_sends_cookie_and_parses_table() {
        let transport = MockTransport::new(vec![response(
            200,
            &[("content-type", "text/html")],
            RENEWALS_PAGE,
        )]);
        let headers = vec![("user-agent".to_string(), "test-agent".to_string())];

        let rows = fetch_renewals(&transport, &renewals_url(), "Session=Test", &headers)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        match &rows[0] {
            RowOutcome::Record(record) => {
                assert_eq!(record.id, 42);
                assert_eq!(record.days_left, 5);
                assert_eq!(record.min_renewal_days, 14);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let request = &transport.requests()[0];
        let cookie = request
            .headers
            .iter()
            .find(|(name, _)| name == "cookie")
            .map(|(_, value)| value.clone());
        assert_eq!(cookie.as_deref(), Some("Session=Test"));
    }

    #[tokio::test]
    async fn test_expired_session_redirect_is_unexpected_status() {
        let transport = MockTransport::new(vec![response(
            302,
            &[("location", "/clientarea.php")],
            "",
        )]);

        let err = fetch_renewals(&transport, &renewals_url(), "Session=Stale", &[])
            .await
            .unwrap_err();
        match err {
            HtmlApiError::UnexpectedStatus { status, .. } => assert_eq!(status, 302),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
