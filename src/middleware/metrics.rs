use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Middleware;
use crate::app::{App, DispatchError};
use crate::events::Event;

/// Middleware collecting dispatch counters.
///
/// All counters use atomic operations so one instance can be shared by
/// applications serving concurrent requests.
///
/// Metrics collected:
/// - Routes executed (`beforeExecuteRoute` seen)
/// - Exceptions offered to the hook, in total and per kind
#[derive(Default)]
pub struct MetricsMiddleware {
    routes_executed: AtomicUsize,
    exceptions: AtomicUsize,
    not_found: AtomicUsize,
}

impl MetricsMiddleware {
    /// Create a metrics middleware with zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actions about to be executed.
    pub fn routes_executed(&self) -> usize {
        self.routes_executed.load(Ordering::Relaxed)
    }

    /// Number of dispatch errors offered to `beforeException`.
    pub fn exceptions(&self) -> usize {
        self.exceptions.load(Ordering::Relaxed)
    }

    /// Subset of [`Self::exceptions`] caused by a missing module, controller or action.
    pub fn not_found(&self) -> usize {
        self.not_found.load(Ordering::Relaxed)
    }
}

impl Middleware for MetricsMiddleware {
    fn before_execute_route(&self, _event: &Event, _app: &App) -> Option<Value> {
        self.routes_executed.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn before_exception(&self, _event: &Event, _app: &App, error: &DispatchError) -> Option<Value> {
        self.exceptions.fetch_add(1, Ordering::Relaxed);
        if error.is_not_found() {
            self.not_found.fetch_add(1, Ordering::Relaxed);
        }
        None
    }
}
