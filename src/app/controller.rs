use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::App;
use crate::router::ParamVec;

/// Type-erased action: builds the controller and runs one of its methods.
pub type ActionFn = Arc<dyn Fn(&App, &ParamVec) -> anyhow::Result<Value> + Send + Sync>;

/// A registered controller: its lookup key and the actions it exposes.
///
/// Built with [`ControllerBuilder`]. The controller value itself is only
/// constructed when an action is invoked, after `dispatch:beforeExecuteRoute`
/// has fired.
#[derive(Clone)]
pub struct ControllerDef {
    key: String,
    actions: HashMap<String, ActionFn>,
}

impl ControllerDef {
    /// Lookup key, e.g. `Blog::PostsController`.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Get an action by its full name, e.g. `showAction`.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<ActionFn> {
        self.actions.get(name).map(Arc::clone)
    }

    /// Sorted action names.
    #[must_use]
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ControllerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDef")
            .field("key", &self.key)
            .field("actions", &self.action_names())
            .finish()
    }
}

/// Builder binding a controller constructor to its action methods.
///
/// ```rust
/// use mvcore::app::{App, ControllerBuilder};
/// use serde_json::json;
///
/// struct PostsController {
///     prefix: String,
/// }
///
/// let app = App::new();
/// app.register_controller(
///     ControllerBuilder::new("PostsController", |_app: &App| PostsController {
///         prefix: "post".into(),
///     })
///     .action("showAction", |c: &mut PostsController, params| {
///         Ok(json!(format!("{}:{}", c.prefix, params[0])))
///     })
///     .build(),
/// );
/// assert!(app.has_controller("PostsController"));
/// ```
pub struct ControllerBuilder<C> {
    key: String,
    ctor: Arc<dyn Fn(&App) -> C + Send + Sync>,
    actions: HashMap<String, ActionFn>,
}

impl<C: 'static> ControllerBuilder<C> {
    pub fn new<F>(key: impl Into<String>, ctor: F) -> Self
    where
        F: Fn(&App) -> C + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            ctor: Arc::new(ctor),
            actions: HashMap::new(),
        }
    }

    /// Expose a method under its full action name (suffix included).
    #[must_use]
    pub fn action<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut C, &ParamVec) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let ctor = Arc::clone(&self.ctor);
        let action: ActionFn = Arc::new(move |app: &App, params: &ParamVec| {
            let mut controller = ctor(app);
            method(&mut controller, params)
        });
        self.actions.insert(name.into(), action);
        self
    }

    #[must_use]
    pub fn build(self) -> ControllerDef {
        ControllerDef {
            key: self.key,
            actions: self.actions,
        }
    }
}

/// Uppercase the first character, leaving the rest untouched.
#[must_use]
pub fn ucfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Controller lookup key for a routed controller name.
///
/// `("users", "Controller", Some("Admin"))` gives `Admin::UsersController`.
#[must_use]
pub fn controller_key(name: &str, suffix: &str, namespace: Option<&str>) -> String {
    let class = format!("{}{}", ucfirst(name), suffix);
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}::{class}"),
        _ => class,
    }
}
