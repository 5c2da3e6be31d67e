//! # App Module
//!
//! The application container and request dispatcher.
//!
//! ## Overview
//!
//! [`App::handle`] turns a URI into the result of a controller action:
//!
//! 1. resolve the `router` service and ask it for a [`ResolvedRoute`](crate::router::ResolvedRoute)
//! 2. if the route names a module with a registered [`ModuleDescriptor`],
//!    load it once: check its path, instantiate its class and call
//!    [`Module::register`]
//! 3. look up the controller registered as `ucfirst(controller) + suffix`,
//!    under the default namespace when one is set
//! 4. look up `action + suffix` on that controller
//! 5. fire `dispatch:beforeExecuteRoute`, build the controller and run the
//!    action with the route's positional parameters
//!
//! Each failure in steps 1-4 is offered to `dispatch:beforeException`
//! before being returned. A listener returning exactly `false` turns it into
//! [`Dispatched::Suppressed`].
//!
//! ## Example
//!
//! ```rust
//! use mvcore::app::{App, ControllerBuilder, Dispatched};
//! use mvcore::router::{PatternRouter, Router};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct UsersController;
//!
//! let app = App::new();
//! app.set_shared("router", Arc::new(PatternRouter::new()) as Arc<dyn Router>);
//! app.register_controller(
//!     ControllerBuilder::new("UsersController", |_app: &App| UsersController)
//!         .action("editAction", |_c: &mut UsersController, params| {
//!             Ok(json!({ "editing": params[0] }))
//!         })
//!         .build(),
//! );
//!
//! let result = app.handle(Some("/users/edit/7")).unwrap();
//! assert_eq!(result, Dispatched::Returned(json!({ "editing": "7" })));
//! ```

mod controller;
mod core;
mod error;
mod module;

pub use controller::{controller_key, ucfirst, ActionFn, ControllerBuilder, ControllerDef};
pub use core::{App, Dispatched, DEFAULT_ACTION_SUFFIX, DEFAULT_CONTROLLER_SUFFIX};
pub use error::DispatchError;
pub use module::{Module, ModuleDescriptor, ModuleRegistry};
