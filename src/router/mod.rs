//! # Router Module
//!
//! The router turns a request URI into a [`ResolvedRoute`]: the module,
//! controller and action to dispatch to, plus the positional parameters for
//! the action.
//!
//! ## Overview
//!
//! [`Router`] is the seam the dispatch core depends on; it is registered in
//! the service container under the `router` key as an `Arc<dyn Router>`.
//! [`PatternRouter`] is the provided implementation with two phases:
//!
//! 1. **Explicit routes**: patterns such as `/posts/{slug}/comments/{page}` are
//!    compiled to regexes at registration time. Placeholders named `module`,
//!    `controller` or `action` override the route target, every other
//!    placeholder becomes a positional parameter.
//!
//! 2. **Conventional fallback**: `/[module/]controller/action/param/...`, where
//!    the module prefix is only recognised for declared module names and
//!    missing segments default to `index`.
//!
//! ## Example
//!
//! ```rust
//! use mvcore::router::{PatternRouter, RouteTarget, Router};
//!
//! let mut router = PatternRouter::new();
//! router.add("/blog/{slug}", RouteTarget::new("posts", "show")).unwrap();
//!
//! let route = router.handle(Some("/blog/hello-world?draft=1"));
//! assert_eq!(route.controller_name, "posts");
//! assert_eq!(route.action_name, "show");
//! assert_eq!(route.params.as_slice(), ["hello-world".to_string()]);
//!
//! let route = router.handle(Some("/users/edit/7"));
//! assert_eq!(route.controller_name, "users");
//! assert_eq!(route.action_name, "edit");
//! assert_eq!(route.params.as_slice(), ["7".to_string()]);
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, PatternRouter, ResolvedRoute, RouteTarget, Router, MAX_INLINE_PARAMS};
