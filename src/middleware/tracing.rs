use serde_json::Value;

use tracing::{info, warn};

use super::Middleware;
use crate::app::{App, DispatchError};
use crate::events::Event;

/// Logs dispatch lifecycle events. Never suppresses.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before_execute_route(&self, event: &Event, app: &App) -> Option<Value> {
        info!(
            event = %event,
            namespace = app.default_namespace().unwrap_or(""),
            "Executing route"
        );
        None
    }

    fn before_exception(&self, event: &Event, _app: &App, error: &DispatchError) -> Option<Value> {
        warn!(event = %event, kind = error.kind(), error = %error, "Dispatch failed");
        None
    }
}
