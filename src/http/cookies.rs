use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::cookie::Cookie;
use super::error::CookieError;
use super::request::Request;
use crate::container::Container;

/// The response cookie bag: every cookie an action sets, sent together.
pub struct Cookies {
    services: Arc<Container>,
    cookies: BTreeMap<String, Cookie>,
    use_encryption: bool,
}

impl Cookies {
    #[must_use]
    pub fn new(services: Arc<Container>) -> Self {
        Self {
            services,
            cookies: BTreeMap::new(),
            use_encryption: false,
        }
    }

    /// Encryption setting applied to cookies created from now on.
    pub fn use_encryption(&mut self, use_encryption: bool) -> &mut Self {
        self.use_encryption = use_encryption;
        self
    }

    #[must_use]
    pub fn is_using_encryption(&self) -> bool {
        self.use_encryption
    }

    /// Set a cookie's value, creating it if needed.
    ///
    /// The cookie is returned so attributes can be adjusted before
    /// [`Cookies::send`].
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<&mut Cookie, CookieError> {
        let cookie = self.entry(name)?;
        cookie.set_value(value);
        Ok(cookie)
    }

    /// Get a cookie from the bag, or a fresh one bound to the incoming
    /// request.
    pub fn get(&mut self, name: &str) -> Result<&mut Cookie, CookieError> {
        self.entry(name)
    }

    /// Whether the bag or the incoming request has the cookie.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        if self.cookies.contains_key(name) {
            return true;
        }
        self.services
            .get_optional::<Arc<Request>>("request")
            .ok()
            .flatten()
            .is_some_and(|request| request.has_cookie(name))
    }

    /// Delete a cookie set in this bag. Returns `false` when it was never set.
    pub fn delete(&mut self, name: &str) -> Result<bool, CookieError> {
        match self.cookies.get_mut(name) {
            Some(cookie) => {
                cookie.delete()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Send every cookie in the bag.
    pub fn send(&mut self) -> Result<(), CookieError> {
        for cookie in self.cookies.values_mut() {
            cookie.send()?;
        }
        debug!(count = self.cookies.len(), "Cookies sent");
        Ok(())
    }

    /// Drop every cookie from the bag without sending.
    pub fn reset(&mut self) -> &mut Self {
        self.cookies.clear();
        self
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.cookies.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    fn entry(&mut self, name: &str) -> Result<&mut Cookie, CookieError> {
        match self.cookies.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut cookie = Cookie::new(name, Arc::clone(&self.services))?;
                cookie.use_encryption(self.use_encryption);
                Ok(entry.insert(cookie))
            }
        }
    }
}
