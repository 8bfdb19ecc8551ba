//! Minimal cookie jar for redirect-chain session tracking.
//!
//! Only the `name=value` pair before the first `;` of each `Set-Cookie` value
//! is kept; attributes (`path`, `HttpOnly`, `expires`, ...) are dropped. The
//! jar serializes back into a single `Cookie` request-header value. The
//! "latest response wins" replacement rule lives in the session walker, not
//! here: the jar itself is just an ordered name/value mapping.

/// Ordered name/value cookie mapping built from `Set-Cookie` header values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    /// Builds a jar from the `Set-Cookie` values of a single response.
    ///
    /// Each value is truncated at its first `;` and split on the first `=`.
    /// Values without a `=` or with an empty name are ignored. Insertion
    /// order follows header order.
    pub fn parse<I, S>(set_cookie: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cookies = set_cookie
            .into_iter()
            .filter_map(|value| {
                let pair = value.as_ref().split(';').next().unwrap_or_default();
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();
        CookieJar { cookies }
    }

    /// True when the jar holds no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Serializes the jar into a `Cookie` request-header value:
    /// `name=value` pairs joined with `;`, in insertion order.
    pub fn serialize(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}
