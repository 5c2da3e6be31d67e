use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::app::{App, DispatchError};

/// Fired before a dispatch-resolution error is raised.
pub const BEFORE_EXCEPTION: &str = "dispatch:beforeException";
/// Fired right before the controller action runs.
pub const BEFORE_EXECUTE_ROUTE: &str = "dispatch:beforeExecuteRoute";

/// A fired event, split into its type and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    event_type: String,
    name: String,
}

impl Event {
    /// Split `dispatch:beforeException` into `dispatch` and `beforeException`.
    ///
    /// A name without a colon has an empty type.
    #[must_use]
    pub fn parse(full_name: &str) -> Self {
        match full_name.split_once(':') {
            Some((ty, name)) => Self {
                event_type: ty.to_string(),
                name: name.to_string(),
            },
            None => Self {
                event_type: String::new(),
                name: full_name.to_string(),
            },
        }
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        if self.event_type.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.event_type, self.name)
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Receives fired events.
///
/// `data` carries the pending error for [`BEFORE_EXCEPTION`] and is `None`
/// otherwise.
pub trait Listener: Send + Sync {
    fn notify(&self, event: &Event, app: &App, data: Option<&DispatchError>) -> Option<Value>;
}

impl<F> Listener for F
where
    F: Fn(&Event, &App, Option<&DispatchError>) -> Option<Value> + Send + Sync,
{
    fn notify(&self, event: &Event, app: &App, data: Option<&DispatchError>) -> Option<Value> {
        self(event, app, data)
    }
}

/// Fires named events to registered listeners.
pub trait EventsManager: Send + Sync {
    /// Attach a listener to a full event name or to an event type.
    fn attach(&self, event_type: &str, listener: Arc<dyn Listener>);

    /// Fire `event_name` and return what the listeners produced.
    fn fire(&self, event_name: &str, app: &App, data: Option<&DispatchError>) -> Option<Value>;
}

/// Whether a `fire` result asks the caller to suppress its error.
#[must_use]
pub fn is_suppressed(result: &Option<Value>) -> bool {
    matches!(result, Some(Value::Bool(false)))
}

/// Default events manager with ordered, synchronous delivery.
///
/// The result of `fire` is the value returned by the last listener that ran.
/// A listener returning `false` stops delivery to the remaining listeners.
#[derive(Default)]
pub struct Manager {
    listeners: RwLock<Vec<(String, Arc<dyn Listener>)>>,
}

impl Manager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached listeners across all event keys.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether anything listens to `event_name` or its type.
    #[must_use]
    pub fn has_listeners(&self, event_name: &str) -> bool {
        let event = Event::parse(event_name);
        self.listeners
            .read()
            .iter()
            .any(|(key, _)| Self::matches(key, &event))
    }

    /// Detach every listener attached under `event_type`.
    pub fn detach_all(&self, event_type: &str) {
        self.listeners.write().retain(|(key, _)| key != event_type);
    }

    fn matches(key: &str, event: &Event) -> bool {
        key == event.event_type() || key == event.full_name()
    }
}

impl EventsManager for Manager {
    fn attach(&self, event_type: &str, listener: Arc<dyn Listener>) {
        self.listeners
            .write()
            .push((event_type.to_string(), listener));
    }

    fn fire(&self, event_name: &str, app: &App, data: Option<&DispatchError>) -> Option<Value> {
        let event = Event::parse(event_name);
        // Snapshot so listeners may attach further listeners while running.
        let queue: Vec<Arc<dyn Listener>> = self
            .listeners
            .read()
            .iter()
            .filter(|(key, _)| Self::matches(key, &event))
            .map(|(_, l)| Arc::clone(l))
            .collect();

        let mut status = None;
        for listener in queue {
            status = listener.notify(&event, app, data);
            if is_suppressed(&status) {
                debug!(event = %event, "Listener stopped event propagation");
                break;
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_parse() {
        let e = Event::parse(BEFORE_EXCEPTION);
        assert_eq!(e.event_type(), "dispatch");
        assert_eq!(e.name(), "beforeException");
        assert_eq!(e.full_name(), BEFORE_EXCEPTION);

        let bare = Event::parse("boot");
        assert_eq!(bare.event_type(), "");
        assert_eq!(bare.full_name(), "boot");
    }

    #[test]
    fn test_is_suppressed_only_for_literal_false() {
        assert!(is_suppressed(&Some(Value::Bool(false))));
        assert!(!is_suppressed(&None));
        assert!(!is_suppressed(&Some(Value::Null)));
        assert!(!is_suppressed(&Some(Value::Bool(true))));
        assert!(!is_suppressed(&Some(json!(0))));
        assert!(!is_suppressed(&Some(json!(""))));
    }

    #[test]
    fn test_fire_runs_in_order_and_stops_on_false() {
        let app = App::new();
        let manager = Manager::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let l1 = Arc::clone(&log);
        manager.attach(
            "dispatch",
            Arc::new(move |e: &Event, _: &App, _: Option<&DispatchError>| {
                l1.lock().push(format!("type:{}", e.name()));
                Some(json!("first"))
            }),
        );
        let l2 = Arc::clone(&log);
        manager.attach(
            BEFORE_EXCEPTION,
            Arc::new(move |_: &Event, _: &App, _: Option<&DispatchError>| {
                l2.lock().push("full".to_string());
                Some(Value::Bool(false))
            }),
        );
        let l3 = Arc::clone(&log);
        manager.attach(
            "dispatch",
            Arc::new(move |e: &Event, _: &App, _: Option<&DispatchError>| {
                l3.lock().push(format!("late:{}", e.name()));
                None
            }),
        );

        let result = manager.fire(BEFORE_EXCEPTION, &app, None);
        assert!(is_suppressed(&result));
        assert_eq!(*log.lock(), vec!["type:beforeException", "full"]);

        // The full-name listener is skipped for other dispatch events and the
        // last listener's value wins.
        log.lock().clear();
        let result = manager.fire(BEFORE_EXECUTE_ROUTE, &app, None);
        assert_eq!(result, None);
        assert_eq!(
            *log.lock(),
            vec!["type:beforeExecuteRoute", "late:beforeExecuteRoute"]
        );
    }

    #[test]
    fn test_fire_without_listeners_is_none() {
        let app = App::new();
        let manager = Manager::new();
        assert_eq!(manager.fire(BEFORE_EXCEPTION, &app, None), None);
        assert!(!manager.has_listeners(BEFORE_EXCEPTION));
    }

    #[test]
    fn test_detach_all() {
        let manager = Manager::new();
        manager.attach(
            "dispatch",
            Arc::new(|_: &Event, _: &App, _: Option<&DispatchError>| None::<Value>),
        );
        assert!(manager.has_listeners(BEFORE_EXECUTE_ROUTE));
        manager.detach_all("dispatch");
        assert_eq!(manager.listener_count(), 0);
    }
}
