//! # Middleware Module
//!
//! Middleware observes the dispatch lifecycle through the events manager.
//!
//! ## Overview
//!
//! A [`Middleware`] implements any of the two dispatch extension points:
//!
//! - `before_execute_route` runs after the controller and action were
//!   resolved and before the controller is built
//! - `before_exception` runs before a resolution error is raised; returning
//!   `Some(Value::Bool(false))` turns the error into a suppressed dispatch
//!
//! Middleware is registered with [`crate::app::App::add_middleware`], which
//! wraps it in a [`MiddlewareListener`] and attaches it to the `dispatch`
//! event type. Registration order is execution order.
//!
//! ## Provided middleware
//!
//! - [`TracingMiddleware`] logs both events with structured fields
//! - [`MetricsMiddleware`] counts executed routes and raised exceptions

mod core;
mod metrics;
mod tracing;

pub use core::{Middleware, MiddlewareListener};
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
