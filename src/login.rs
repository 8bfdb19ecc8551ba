//! The login handshake.
//!
//! Composes the session walker, the form extractor and the transport into the
//! full login flow: reach the login page, fill credentials into its form,
//! submit, and derive the authenticated session from the redirect response.
//! Exactly one attempt per call; every precondition failure is terminal.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::cookies::CookieJar;
use crate::error_handling::HtmlApiError;
use crate::forms::{extract_login_form, FormInput};
use crate::http::{is_redirect, Transport, TransportRequest};
use crate::session::follow_to_terminal_page;

/// Input names the login form must provide.
const REQUIRED_INPUTS: [&str; 3] = ["token", "username", "password"];

const ABSOLUTE_URL_PATTERN: &str = r"(?i)^https?://";

static ABSOLUTE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ABSOLUTE_URL_PATTERN).expect("Failed to compile URL regex - this is a bug")
});

/// The authenticated state produced by a successful login, consumed by
/// subsequent fetches within the same process run. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    /// Where the post-login redirect pointed.
    pub address: Url,
    /// Serialized cookie jar for the `Cookie` request header.
    pub cookies: String,
}

/// Performs the full login handshake against `url`.
///
/// Walks redirects to the login page (within `max_hops`), extracts the form
/// around its password input, fills `username`/`password` in, submits the
/// form URL-encoded with the session cookie and the login page as `Referer`,
/// and derives the session from the redirect answer.
///
/// Fails with [`HtmlApiError::MissingSessionCookie`] when the login page set
/// no cookie, [`HtmlApiError::MissingFormAction`] /
/// [`HtmlApiError::InvalidFormMethod`] / [`HtmlApiError::MissingRequiredInputs`]
/// when the form is not submittable, and
/// [`HtmlApiError::LoginRequestNoRedirect`] /
/// [`HtmlApiError::LoginRequestNoCookie`] when the submission answer does not
/// establish a session.
pub async fn login<T: Transport>(
    transport: &T,
    url: &Url,
    username: &str,
    password: &str,
    headers: &[(String, String)],
    max_hops: usize,
) -> Result<Session, HtmlApiError> {
    let page = follow_to_terminal_page(transport, url, headers, max_hops).await?;
    if page.cookies.is_empty() {
        return Err(HtmlApiError::MissingSessionCookie {
            url: page.address.to_string(),
        });
    }

    let form = extract_login_form(&page.html)?;
    let post_url = resolve_action(&form.action, &page.address)?;
    if form.method != "post" {
        return Err(HtmlApiError::InvalidFormMethod {
            method: form.method,
        });
    }

    let mut fields = form_fields(&form.inputs);
    let missing: Vec<String> = REQUIRED_INPUTS
        .iter()
        .filter(|required| !fields.iter().any(|(name, _)| name == *required))
        .map(|required| format!("\"{required}\""))
        .collect();
    if !missing.is_empty() {
        return Err(HtmlApiError::MissingRequiredInputs {
            missing: missing.join(", "),
        });
    }
    set_field(&mut fields, "username", username);
    set_field(&mut fields, "password", password);

    let mut request_headers = headers.to_vec();
    request_headers.push(("referer".to_string(), page.address.to_string()));
    request_headers.push((
        "accept".to_string(),
        "text/html,application/xhtml+xml,application/xml".to_string(),
    ));
    request_headers.push(("cache-control".to_string(), "no-cache".to_string()));
    request_headers.push(("pragma".to_string(), "no-cache".to_string()));
    request_headers.push((
        "content-type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    ));
    request_headers.push(("cookie".to_string(), page.cookies.serialize()));

    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter().map(|(name, value)| (name, value)))
        .finish();

    let response = transport
        .request(TransportRequest::post(
            post_url.clone(),
            request_headers,
            body,
        ))
        .await?;

    if !is_redirect(Some(response.status)) {
        return Err(HtmlApiError::LoginRequestNoRedirect {
            status: response.status,
            url: post_url.to_string(),
        });
    }
    let set_cookie = response.set_cookie_values();
    if set_cookie.is_empty() {
        return Err(HtmlApiError::LoginRequestNoCookie {
            url: post_url.to_string(),
        });
    }

    let cookies = CookieJar::parse(&set_cookie).serialize();
    let address = match response.header("location") {
        Some(location) => post_url
            .join(location)
            .unwrap_or_else(|_| post_url.clone()),
        None => post_url,
    };

    Ok(Session { address, cookies })
}

/// Resolves the form `action` to an absolute URL: kept as-is when already
/// `http(s)://`, otherwise resolved against the login page address (which
/// covers both absolute paths and relative actions).
fn resolve_action(action: &str, page_url: &Url) -> Result<Url, HtmlApiError> {
    if action.is_empty() {
        return Err(HtmlApiError::MissingFormAction {
            detail: "the form \"action\" is empty".to_string(),
        });
    }
    let resolved = if ABSOLUTE_URL_REGEX.is_match(action) {
        Url::parse(action)
    } else {
        page_url.join(action)
    };
    resolved.map_err(|error| HtmlApiError::MissingFormAction {
        detail: format!("the form \"action\" {action:?} is not a usable URL: {error}"),
    })
}

/// Collapses the extracted inputs into submission fields: unnamed inputs are
/// dropped, duplicate names keep their first position with the last value.
fn form_fields(inputs: &[FormInput]) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for input in inputs {
        if input.name.is_empty() {
            continue;
        }
        match fields.iter_mut().find(|field| field.0 == input.name) {
            Some(field) => field.1 = input.value.clone(),
            None => fields.push((input.name.clone(), input.value.clone())),
        }
    }
    fields
}

fn set_field(fields: &mut [(String, String)], name: &str, value: &str) {
    if let Some(field) = fields.iter_mut().find(|field| field.0 == name) {
        field.1 = value.to_string();
    }
}
