use http::header::COOKIE;
use http::HeaderMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Parse a `Cookie` header value (`a=b; c=d`) into name/value pairs.
///
/// Values are URL-decoded; a malformed escape leaves the raw value.
#[must_use]
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let raw = parts.next().unwrap_or("").trim();
            let value = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            Some((name.to_string(), value))
        })
        .collect()
}

/// The incoming cookie set of the current request.
///
/// Registered in the container as `Arc<Request>` under `request`.
#[derive(Debug, Default)]
pub struct Request {
    cookies: RwLock<HashMap<String, String>>,
}

impl Request {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw `Cookie` header value.
    #[must_use]
    pub fn from_cookie_header(header: &str) -> Self {
        Self::with_cookies(parse_cookies(header))
    }

    /// Build from request headers, merging every `Cookie` header.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();
        for value in headers.get_all(COOKIE) {
            if let Ok(header) = value.to_str() {
                cookies.extend(parse_cookies(header));
            }
        }
        debug!(
            cookie_count = cookies.len(),
            cookie_names = ?cookies.keys().collect::<Vec<_>>(),
            "Cookies extracted"
        );
        Self::with_cookies(cookies)
    }

    #[must_use]
    pub fn with_cookies(cookies: HashMap<String, String>) -> Self {
        Self {
            cookies: RwLock::new(cookies),
        }
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.read().get(name).cloned()
    }

    #[must_use]
    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.read().contains_key(name)
    }

    /// Drop an incoming cookie for the rest of this request.
    pub fn forget(&self, name: &str) {
        self.cookies.write().remove(name);
    }

    #[must_use]
    pub fn cookie_names(&self) -> Vec<String> {
        self.cookies.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("a=b; c=d;  e=hello%20world; =skip; flag");
        assert_eq!(cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(cookies.get("c"), Some(&"d".to_string()));
        assert_eq!(cookies.get("e"), Some(&"hello world".to_string()));
        assert_eq!(cookies.get("flag"), Some(&String::new()));
        assert_eq!(cookies.len(), 4);
    }

    #[test]
    fn test_from_headers_and_forget() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("b=2"));
        let req = Request::from_headers(&headers);
        assert_eq!(req.cookie("a").as_deref(), Some("1"));
        assert!(req.has_cookie("b"));
        req.forget("b");
        assert!(!req.has_cookie("b"));
    }
}
