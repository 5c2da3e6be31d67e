//! # HTTP Module
//!
//! Cookie handling for the dispatch core, plus the narrow collaborators it
//! talks to.
//!
//! ## Overview
//!
//! - [`Cookie`]: one cookie whose attributes are persisted in the session
//!   under `_PHCOOKIE_<name>`, with optional transparent encryption
//! - [`Cookies`]: the response bag of cookies set during an action
//! - [`Request`]: incoming cookie set (`request` service)
//! - [`ResponseCookies`]: outbound `Set-Cookie` collector (`response` service)
//! - [`Session`], [`Crypt`], [`Filter`]: collaborator traits with the
//!   in-process [`MemorySession`], AES-256-GCM [`AesCrypt`] and
//!   [`BasicFilter`] implementations
//!
//! HTTP transport is out of scope: the host reads
//! [`ResponseCookies::headers`] and writes them to its own response.
//!
//! ## Example
//!
//! ```rust
//! use mvcore::container::Container;
//! use mvcore::http::{Cookie, MemorySession, Request, ResponseCookies, Session};
//! use std::sync::Arc;
//!
//! let services = Arc::new(Container::new());
//! let response = Arc::new(ResponseCookies::new());
//! services.set_shared("request", Arc::new(Request::from_cookie_header("theme=dark")));
//! services.set_shared("response", Arc::clone(&response));
//! services.set_shared("session", Arc::new(MemorySession::new()) as Arc<dyn Session>);
//!
//! let mut theme = Cookie::new("theme", Arc::clone(&services)).unwrap();
//! assert_eq!(theme.get_value(None, None).unwrap().as_deref(), Some("dark"));
//!
//! theme.set_value("light");
//! theme.set_expiration(1_900_000_000).unwrap();
//! theme.send().unwrap();
//! assert_eq!(response.last("theme").unwrap().value, "light");
//! ```

mod cookie;
mod cookies;
mod crypt;
mod error;
mod filter;
mod request;
mod response;
mod session;

pub use cookie::{Cookie, SameSite, DELETE_EXPIRY_OFFSET, SESSION_KEY_PREFIX};
pub use cookies::Cookies;
pub use crypt::{AesCrypt, Crypt};
pub use error::{CookieError, CryptError, FilterError};
pub use filter::{BasicFilter, Filter};
pub use request::{parse_cookies, Request};
pub use response::{ResponseCookies, SetCookie};
pub use session::{MemorySession, Session};
