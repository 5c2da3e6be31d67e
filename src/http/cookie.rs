use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::crypt::Crypt;
use super::error::CookieError;
use super::filter::Filter;
use super::request::Request;
use super::response::{ResponseCookies, SetCookie};
use super::session::Session;
use crate::container::Container;

/// Prefix of the session key holding a cookie's persisted attributes.
pub const SESSION_KEY_PREFIX: &str = "_PHCOOKIE_";

/// How far in the past a deleted cookie expires, in seconds (8 days).
pub const DELETE_EXPIRY_OFFSET: i64 = 691_200;

/// `SameSite` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl FromStr for SameSite {
    type Err = CookieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(CookieError::InvalidArgument(format!(
                "unknown SameSite policy '{s}'"
            ))),
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// Attributes persisted to the session. Absent keys are left untouched on
/// restore.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct CookieDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expire: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secure: Option<bool>,
    #[serde(default, rename = "httpOnly", skip_serializing_if = "Option::is_none")]
    http_only: Option<bool>,
    #[serde(default, rename = "sameSite", skip_serializing_if = "Option::is_none")]
    same_site: Option<SameSite>,
}

impl CookieDefinition {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One HTTP cookie whose attributes survive across requests in the session.
///
/// Collaborators are resolved from the container when needed:
/// `request` (`Arc<Request>`), `response` (`Arc<ResponseCookies>`) and, when
/// registered, `session` (`Arc<dyn Session>`), `crypt` (`Arc<dyn Crypt>`)
/// and `filter` (`Arc<dyn Filter>`).
pub struct Cookie {
    name: String,
    value: Option<String>,
    expire: i64,
    path: String,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
    use_encryption: bool,
    read: bool,
    restored: bool,
    services: Arc<Container>,
}

impl Cookie {
    /// Create a session cookie on `/`, `HttpOnly`, with no value.
    pub fn new(name: &str, services: Arc<Container>) -> Result<Self, CookieError> {
        if !is_token(name) {
            return Err(CookieError::InvalidArgument(format!(
                "invalid cookie name '{name}'"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            value: None,
            expire: 0,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: None,
            use_encryption: false,
            read: false,
            restored: false,
            services,
        })
    }

    /// Initial value. Unlike [`Cookie::set_value`] the incoming request is
    /// still consulted by [`Cookie::get_value`].
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_expire(mut self, expire: i64) -> Self {
        self.expire = expire;
        self
    }

    pub fn with_path(mut self, path: &str) -> Result<Self, CookieError> {
        self.path = checked_attribute("path", path)?;
        Ok(self)
    }

    pub fn with_domain(mut self, domain: &str) -> Result<Self, CookieError> {
        self.domain = Some(checked_attribute("domain", domain)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: &str) -> Result<Self, CookieError> {
        self.same_site = Some(same_site.parse()?);
        Ok(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The in-memory value, without consulting the request.
    #[must_use]
    pub fn raw_value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn use_encryption(&mut self, use_encryption: bool) -> &mut Self {
        self.use_encryption = use_encryption;
        self
    }

    #[must_use]
    pub fn is_using_encryption(&self) -> bool {
        self.use_encryption
    }

    pub fn set_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.value = Some(value.into());
        self.read = true;
        self
    }

    /// Current value, pulled from the incoming request on first use.
    ///
    /// The pulled value is decrypted when encryption is on and cached, so a
    /// second call does not touch the request or the crypt service again.
    /// `filters` are applied through the `filter` service on every call.
    /// Returns `default` when the request carries no such cookie.
    pub fn get_value(
        &mut self,
        filters: Option<&[&str]>,
        default: Option<&str>,
    ) -> Result<Option<String>, CookieError> {
        self.restore()?;

        if !self.read {
            let request: Arc<Request> = self
                .services
                .get("request")
                .map_err(|e| CookieError::missing("request", &e))?;
            let Some(raw) = request.cookie(&self.name) else {
                return Ok(default.map(str::to_string));
            };
            let value = if self.use_encryption {
                self.crypt()?.decrypt_base64(&raw)?
            } else {
                raw
            };
            debug!(
                cookie = %self.name,
                encrypted = self.use_encryption,
                "Cookie pulled from request"
            );
            self.value = Some(value);
            self.read = true;
        }

        match (&self.value, filters) {
            (Some(value), Some(filters)) => Ok(Some(self.filter()?.sanitize(value, filters)?)),
            (value, _) => Ok(value.clone()),
        }
    }

    /// Persist attributes to the session and emit the `Set-Cookie` header.
    pub fn send(&mut self) -> Result<&mut Self, CookieError> {
        let response = self.response()?;

        if let Some(session) = self.session()? {
            let definition = self.definition();
            if !definition.is_empty() {
                let stored = serde_json::to_value(&definition)
                    .map_err(|e| CookieError::InvalidArgument(e.to_string()))?;
                session.set(&self.session_key(), stored);
            }
        }

        let value = match self.value.as_deref() {
            Some(value) if self.use_encryption && !value.is_empty() => {
                self.crypt()?.encrypt_base64(value)?
            }
            value => value.unwrap_or_default().to_string(),
        };

        response.push(SetCookie {
            name: self.name.clone(),
            value,
            expires: self.expire,
            path: self.path.clone(),
            domain: self.domain.clone(),
            secure: self.secure,
            http_only: self.http_only,
            same_site: self.same_site,
        });
        debug!(cookie = %self.name, expire = self.expire, "Cookie sent");
        Ok(self)
    }

    /// Merge attributes persisted by a previous [`Cookie::send`]. Runs once.
    pub fn restore(&mut self) -> Result<&mut Self, CookieError> {
        if self.restored {
            return Ok(self);
        }
        if let Some(session) = self.session()? {
            if let Some(stored) = session.get(&self.session_key()) {
                match serde_json::from_value::<CookieDefinition>(stored) {
                    Ok(definition) => self.merge(definition),
                    Err(err) => {
                        debug!(
                            cookie = %self.name,
                            error = %err,
                            "Ignoring malformed cookie definition"
                        );
                    }
                }
            }
        }
        self.restored = true;
        Ok(self)
    }

    /// Forget the cookie here and ask the client to drop it.
    pub fn delete(&mut self) -> Result<(), CookieError> {
        let response = self.response()?;

        if let Some(session) = self.session()? {
            session.remove(&self.session_key());
        }
        if let Ok(Some(request)) = self.services.get_optional::<Arc<Request>>("request") {
            request.forget(&self.name);
        }
        self.value = None;
        self.read = false;

        response.push(SetCookie {
            name: self.name.clone(),
            value: String::new(),
            expires: chrono::Utc::now().timestamp() - DELETE_EXPIRY_OFFSET,
            path: self.path.clone(),
            domain: self.domain.clone(),
            secure: self.secure,
            http_only: self.http_only,
            same_site: self.same_site,
        });
        debug!(cookie = %self.name, "Cookie deleted");
        Ok(())
    }

    pub fn set_expiration(&mut self, expire: i64) -> Result<&mut Self, CookieError> {
        self.restore()?;
        self.expire = expire;
        Ok(self)
    }

    pub fn expiration(&mut self) -> Result<i64, CookieError> {
        self.restore()?;
        Ok(self.expire)
    }

    pub fn set_path(&mut self, path: &str) -> Result<&mut Self, CookieError> {
        let path = checked_attribute("path", path)?;
        self.restore()?;
        self.path = path;
        Ok(self)
    }

    pub fn path(&mut self) -> Result<String, CookieError> {
        self.restore()?;
        Ok(self.path.clone())
    }

    pub fn set_domain(&mut self, domain: &str) -> Result<&mut Self, CookieError> {
        let domain = checked_attribute("domain", domain)?;
        self.restore()?;
        self.domain = Some(domain);
        Ok(self)
    }

    pub fn domain(&mut self) -> Result<Option<String>, CookieError> {
        self.restore()?;
        Ok(self.domain.clone())
    }

    pub fn set_secure(&mut self, secure: bool) -> Result<&mut Self, CookieError> {
        self.restore()?;
        self.secure = secure;
        Ok(self)
    }

    pub fn secure(&mut self) -> Result<bool, CookieError> {
        self.restore()?;
        Ok(self.secure)
    }

    pub fn set_http_only(&mut self, http_only: bool) -> Result<&mut Self, CookieError> {
        self.restore()?;
        self.http_only = http_only;
        Ok(self)
    }

    pub fn http_only(&mut self) -> Result<bool, CookieError> {
        self.restore()?;
        Ok(self.http_only)
    }

    pub fn set_same_site(&mut self, same_site: &str) -> Result<&mut Self, CookieError> {
        let same_site: SameSite = same_site.parse()?;
        self.restore()?;
        self.same_site = Some(same_site);
        Ok(self)
    }

    pub fn same_site(&mut self) -> Result<Option<SameSite>, CookieError> {
        self.restore()?;
        Ok(self.same_site)
    }

    fn session_key(&self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.name)
    }

    fn definition(&self) -> CookieDefinition {
        CookieDefinition {
            expire: (self.expire != 0).then_some(self.expire),
            path: (!self.path.is_empty()).then(|| self.path.clone()),
            domain: self.domain.clone().filter(|d| !d.is_empty()),
            secure: self.secure.then_some(true),
            http_only: self.http_only.then_some(true),
            same_site: self.same_site,
        }
    }

    fn merge(&mut self, definition: CookieDefinition) {
        if let Some(expire) = definition.expire {
            self.expire = expire;
        }
        if let Some(domain) = definition.domain {
            self.domain = Some(domain);
        }
        if let Some(path) = definition.path {
            self.path = path;
        }
        if let Some(secure) = definition.secure {
            self.secure = secure;
        }
        if let Some(http_only) = definition.http_only {
            self.http_only = http_only;
        }
        if let Some(same_site) = definition.same_site {
            self.same_site = Some(same_site);
        }
    }

    fn session(&self) -> Result<Option<Arc<dyn Session>>, CookieError> {
        self.services
            .get_optional("session")
            .map_err(|e| CookieError::missing("session", &e))
    }

    fn response(&self) -> Result<Arc<ResponseCookies>, CookieError> {
        self.services
            .get("response")
            .map_err(|e| CookieError::missing("response", &e))
    }

    fn crypt(&self) -> Result<Arc<dyn Crypt>, CookieError> {
        self.services
            .get("crypt")
            .map_err(|e| CookieError::missing("crypt", &e))
    }

    fn filter(&self) -> Result<Arc<dyn Filter>, CookieError> {
        self.services
            .get("filter")
            .map_err(|e| CookieError::missing("filter", &e))
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("expire", &self.expire)
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .field("use_encryption", &self.use_encryption)
            .field("read", &self.read)
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}

/// RFC 6265 cookie-name token.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        })
}

fn checked_attribute(attribute: &str, value: &str) -> Result<String, CookieError> {
    if value.chars().any(|c| c == ';' || c.is_control()) {
        return Err(CookieError::InvalidArgument(format!(
            "invalid cookie {attribute} '{}'",
            value.escape_debug()
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MemorySession;
    use serde_json::json;

    fn services() -> Arc<Container> {
        let c = Container::new();
        c.set_shared("request", Arc::new(Request::new()));
        c.set_shared("response", Arc::new(ResponseCookies::new()));
        Arc::new(c)
    }

    #[test]
    fn test_invalid_names_rejected() {
        for name in ["", "a b", "a;b", "a=b", "é"] {
            assert!(matches!(
                Cookie::new(name, services()),
                Err(CookieError::InvalidArgument(_))
            ));
        }
        assert!(Cookie::new("session_id", services()).is_ok());
    }

    #[test]
    fn test_same_site_parse() {
        assert_eq!("lax".parse::<SameSite>().unwrap(), SameSite::Lax);
        assert_eq!("Strict".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert!("sometimes".parse::<SameSite>().is_err());
    }

    #[test]
    fn test_invalid_setter_input_leaves_cookie_untouched() {
        let mut cookie = Cookie::new("c", services()).unwrap();
        assert!(cookie.set_same_site("sometimes").is_err());
        assert!(cookie.set_path("/a;b").is_err());
        assert_eq!(cookie.same_site().unwrap(), None);
        assert_eq!(cookie.path().unwrap(), "/");
    }

    #[test]
    fn test_definition_skips_defaults() {
        let cookie = Cookie::new("c", services())
            .unwrap()
            .with_http_only(false)
            .with_path("")
            .unwrap();
        assert!(cookie.definition().is_empty());

        let cookie = Cookie::new("c", services()).unwrap().with_expire(10);
        assert_eq!(
            serde_json::to_value(cookie.definition()).unwrap(),
            json!({"expire": 10, "path": "/", "httpOnly": true})
        );
    }

    #[test]
    fn test_restore_merges_only_present_keys() {
        let container = services();
        let session = Arc::new(MemorySession::new());
        session.set("_PHCOOKIE_c", json!({"domain": "example.com", "sameSite": "Lax"}));
        container.set_shared("session", session as Arc<dyn Session>);

        let mut cookie = Cookie::new("c", container).unwrap().with_expire(99);
        assert_eq!(cookie.domain().unwrap().as_deref(), Some("example.com"));
        assert_eq!(cookie.same_site().unwrap(), Some(SameSite::Lax));
        assert_eq!(cookie.expiration().unwrap(), 99);
        assert_eq!(cookie.path().unwrap(), "/");
    }

    #[test]
    fn test_restore_runs_once() {
        let container = services();
        let session = Arc::new(MemorySession::new());
        container.set_shared("session", Arc::clone(&session) as Arc<dyn Session>);

        let mut cookie = Cookie::new("c", container).unwrap();
        cookie.restore().unwrap();
        session.set("_PHCOOKIE_c", json!({"path": "/late"}));
        assert_eq!(cookie.path().unwrap(), "/");
    }

    #[test]
    fn test_wrong_session_type_is_missing_service() {
        let container = services();
        container.set_shared("session", "not a session");
        let mut cookie = Cookie::new("c", container).unwrap();
        assert!(matches!(
            cookie.restore(),
            Err(CookieError::MissingService { service: "session", .. })
        ));
    }
}
