use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Errors produced by the HTML login and scraping pipeline.
///
/// Every variant is terminal for the operation that produced it: the pipeline
/// performs exactly one attempt per call and leaves retry policy to the caller.
/// Row-level parse failures are *not* represented here; they are returned as
/// data (`RowOutcome::Error`) so one malformed row never discards a batch.
#[derive(Error, Debug)]
pub enum HtmlApiError {
    /// Connection-level failure (DNS, refused, reset, timeout). Distinct from
    /// a response that was fetched but carried an unwanted status.
    #[error("transport failure for \"{url}\": {source}")]
    Transport {
        /// The URL the request was addressed to.
        url: String,
        /// The underlying client error.
        #[source]
        source: ReqwestError,
    },

    /// Response status was neither a redirect nor an accepted success code.
    #[error("received status code \"{status}\" without a redirection from \"{url}\"")]
    UnexpectedStatus {
        /// The offending status code.
        status: u16,
        /// The URL that produced it.
        url: String,
    },

    /// Success status, but the body is not HTML where HTML was required.
    #[error(
        "received a success status code \"{status}\" from \"{url}\", but unsupported content-type {content_type:?}"
    )]
    UnsupportedContentType {
        /// The success status that was returned.
        status: u16,
        /// The URL that produced it.
        url: String,
        /// The content type the server sent, if any.
        content_type: Option<String>,
    },

    /// Redirect budget exhausted without reaching a terminal page.
    #[error("maximum requests reached: {max_hops}")]
    MaxRequestsReached {
        /// The hop budget that was exhausted.
        max_hops: usize,
    },

    /// No login form could be extracted from the page. The reason
    /// distinguishes "no password input anywhere" from "password input
    /// without an enclosing form".
    #[error("login form extraction failed: {reason}")]
    FormNotFound {
        /// Which part of the password-input heuristic failed.
        reason: String,
    },

    /// The renewal-table locator heuristic found no matching table.
    #[error("table of renewable domains not found (no header cell matching {label:?})")]
    TableNotFound {
        /// The header label the locator searched for.
        label: String,
    },

    /// The login page came back without any session cookie. A cookie-less
    /// login page means the site changed or the target is wrong.
    #[error("login failed: no session cookie received from \"{url}\"")]
    MissingSessionCookie {
        /// The terminal login-page address.
        url: String,
    },

    /// The form `action` was empty or not resolvable to a URL.
    #[error("login failed: {detail}")]
    MissingFormAction {
        /// What made the action unusable.
        detail: String,
    },

    /// The form submission method was something other than POST.
    #[error("login failed: form \"method\" must be \"post\", got {method:?}")]
    InvalidFormMethod {
        /// The method the form declared.
        method: String,
    },

    /// One or more of the required login inputs are absent from the form.
    #[error("login failed: the required inputs {missing} are missing from the login form")]
    MissingRequiredInputs {
        /// The missing input names, quoted and comma-separated.
        missing: String,
    },

    /// The credential POST did not answer with a redirect.
    #[error("login request received a status code \"{status}\" without a redirection from \"{url}\"")]
    LoginRequestNoRedirect {
        /// The non-redirect status the server returned.
        status: u16,
        /// The POST target.
        url: String,
    },

    /// The credential POST redirected but set no cookie.
    #[error("login response from \"{url}\" has no set-cookie header")]
    LoginRequestNoCookie {
        /// The POST target.
        url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_not_found_messages_are_distinguishable() {
        let no_password = HtmlApiError::FormNotFound {
            reason: "input[type=password] not found".to_string(),
        };
        let no_form = HtmlApiError::FormNotFound {
            reason: "parent form of input[type=password] not found".to_string(),
        };
        assert!(no_password.to_string().contains("password"));
        assert!(no_password.to_string().contains("not found"));
        assert!(no_form.to_string().contains("parent form"));
        assert_ne!(no_password.to_string(), no_form.to_string());
    }

    #[test]
    fn test_unexpected_status_names_code_and_url() {
        let err = HtmlApiError::UnexpectedStatus {
            status: 500,
            url: "http://example.com/".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("http://example.com/"));
    }

    #[test]
    fn test_max_requests_reached_names_budget() {
        let err = HtmlApiError::MaxRequestsReached { max_hops: 4 };
        assert_eq!(err.to_string(), "maximum requests reached: 4");
    }
}
