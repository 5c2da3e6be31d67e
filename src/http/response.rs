use chrono::DateTime;
use http::header::{InvalidHeaderValue, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use std::fmt;
use tracing::warn;

use super::cookie::SameSite;

/// One outbound `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Unix seconds, `0` for a session cookie
    pub expires: i64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl SetCookie {
    /// Render as a header value.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }

    /// Whether this header asks the client to drop the cookie.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.expires != 0 && self.expires < chrono::Utc::now().timestamp()
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, urlencoding::encode(&self.value))?;
        if self.expires != 0 {
            if let Some(at) = DateTime::from_timestamp(self.expires, 0) {
                write!(f, "; Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT"))?;
            }
        }
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            write!(f, "; Domain={domain}")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={same_site}")?;
        }
        Ok(())
    }
}

/// Collects the `Set-Cookie` headers emitted while handling a request.
///
/// Registered in the container as `Arc<ResponseCookies>` under `response`.
#[derive(Debug, Default)]
pub struct ResponseCookies {
    sent: Mutex<Vec<SetCookie>>,
}

impl ResponseCookies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, cookie: SetCookie) {
        self.sent.lock().push(cookie);
    }

    /// Everything emitted so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<SetCookie> {
        self.sent.lock().clone()
    }

    /// The last header emitted for `name`.
    #[must_use]
    pub fn last(&self, name: &str) -> Option<SetCookie> {
        self.sent.lock().iter().rev().find(|c| c.name == name).cloned()
    }

    /// Drain the collected headers.
    pub fn take(&self) -> Vec<SetCookie> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Render the collected headers. Unrepresentable values are skipped.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in self.sent.lock().iter() {
            match cookie.to_header_value() {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(err) => {
                    warn!(
                        cookie = %cookie.name,
                        error = %err,
                        "Skipping invalid Set-Cookie header"
                    );
                }
            }
        }
        headers
    }
}
