//! # Events Module
//!
//! Named lifecycle events fired by the dispatch core and the listeners that
//! observe them.
//!
//! ## Overview
//!
//! Event names have the shape `<type>:<name>`. The dispatch core fires two of
//! them:
//!
//! - [`BEFORE_EXECUTE_ROUTE`] right before the controller is instantiated;
//!   the return value is ignored
//! - [`BEFORE_EXCEPTION`] before every dispatch-resolution error is raised;
//!   a literal `false` from the listeners suppresses the error
//!
//! [`EventsManager`] is the seam a host application can replace wholesale.
//! [`Manager`] is the provided implementation: listeners attach either to a
//! full event name or to an event type, and run synchronously in
//! registration order.
//!
//! ## Suppression contract
//!
//! `fire` returns `Option<serde_json::Value>`. `None` means no listener
//! produced a value. Only `Some(Value::Bool(false))` suppresses, see
//! [`is_suppressed`]; `Some(Value::Null)` and every other value do not.

mod core;

pub use core::{
    is_suppressed, Event, EventsManager, Listener, Manager, BEFORE_EXCEPTION,
    BEFORE_EXECUTE_ROUTE,
};
