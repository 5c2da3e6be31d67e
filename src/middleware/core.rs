use serde_json::Value;
use std::sync::Arc;

use crate::app::{App, DispatchError};
use crate::events::{Event, Listener};

/// Dispatch lifecycle middleware. Both hooks default to doing nothing.
pub trait Middleware: Send + Sync {
    fn before_execute_route(&self, _event: &Event, _app: &App) -> Option<Value> {
        None
    }

    fn before_exception(
        &self,
        _event: &Event,
        _app: &App,
        _error: &DispatchError,
    ) -> Option<Value> {
        None
    }
}

/// Adapts a [`Middleware`] to the [`Listener`] interface by event name.
pub struct MiddlewareListener {
    inner: Arc<dyn Middleware>,
}

impl MiddlewareListener {
    pub fn new(inner: Arc<dyn Middleware>) -> Self {
        Self { inner }
    }
}

impl Listener for MiddlewareListener {
    fn notify(&self, event: &Event, app: &App, data: Option<&DispatchError>) -> Option<Value> {
        match (event.name(), data) {
            ("beforeExecuteRoute", _) => self.inner.before_execute_route(event, app),
            ("beforeException", Some(error)) => self.inner.before_exception(event, app, error),
            _ => None,
        }
    }
}
