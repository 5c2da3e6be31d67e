//! # mvcore
//!
//! **mvcore** is a small MVC application core: it dispatches request URIs to
//! controller actions through a router, lets middleware observe and veto the
//! dispatch, loads modules on demand, manages session-backed HTTP cookies
//! and maps typed records onto a document store.
//!
//! ## Overview
//!
//! The library is organized into these modules:
//!
//! - **[`app`]** - The dispatch core: [`app::App`], controller and module registries
//! - **[`container`]** - String-keyed service registry of shared values and factories
//! - **[`events`]** - Events manager and listeners (`dispatch:beforeException`,
//!   `dispatch:beforeExecuteRoute`)
//! - **[`middleware`]** - Middleware attached to dispatch events (tracing, metrics)
//! - **[`router`]** - Router seam and the pattern/convention router
//! - **[`http`]** - Cookies, cookie bag, request/response cookie plumbing,
//!   session, crypt and filter collaborators
//! - **[`db`]** - Document mapper: models, mapper, lazy connection, in-memory store
//! - **[`config`]** - YAML configuration with environment overrides
//! - **[`logging`]** - `tracing-subscriber` initialisation
//! - **[`cli`]** - The `mvcore` inspection binary
//!
//! ### Dispatch Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant App as app::App
//!     participant Router as router service
//!     participant Events as EventsManager
//!     participant Module
//!     participant Action
//!
//!     Host->>App: handle(uri)
//!     App->>Router: handle(uri)
//!     Router-->>App: ResolvedRoute
//!     opt module in route
//!         App->>Module: register(app) (first use only)
//!     end
//!     App->>App: resolve controller + action
//!     alt resolution fails
//!         App->>Events: fire(dispatch:beforeException)
//!         Events-->>App: false suppresses, anything else raises
//!     else resolved
//!         App->>Events: fire(dispatch:beforeExecuteRoute)
//!         App->>Action: call(app, params)
//!         Action-->>Host: value
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mvcore::app::{App, ControllerBuilder};
//! use mvcore::router::{PatternRouter, Router};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct PostsController;
//!
//! let app = App::new();
//! app.set_shared("router", Arc::new(PatternRouter::new()) as Arc<dyn Router>);
//! app.register_controller(
//!     ControllerBuilder::new("PostsController", |_app: &App| PostsController)
//!         .action("showAction", |_c, params| Ok(json!({ "post": params[0] })))
//!         .build(),
//! );
//!
//! let result = app.handle(Some("/posts/show/hello")).unwrap();
//! assert_eq!(result.into_value(), Some(json!({ "post": "hello" })));
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod container;
pub mod db;
pub mod events;
pub mod http;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;

pub use app::{App, DispatchError, Dispatched};
pub use container::{Container, Service, ServiceError};
