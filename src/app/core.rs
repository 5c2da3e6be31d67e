use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use serde_json::Value;
use std::any::Any;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

use super::controller::{controller_key, ControllerDef};
use super::error::DispatchError;
use super::module::{Module, ModuleDescriptor, ModuleRegistry};
use crate::config::AppConfig;
use crate::container::{Container, Service, ServiceError};
use crate::db::{Connection, Connector, MemoryConnector};
use crate::events::{
    is_suppressed, EventsManager, Listener, Manager, BEFORE_EXCEPTION, BEFORE_EXECUTE_ROUTE,
};
use crate::http::{AesCrypt, Crypt};
use crate::ids::DispatchId;
use crate::middleware::{Middleware, MiddlewareListener};
use crate::router::Router;

/// Default suffix appended to routed controller names.
pub const DEFAULT_CONTROLLER_SUFFIX: &str = "Controller";
/// Default suffix appended to routed action names.
pub const DEFAULT_ACTION_SUFFIX: &str = "Action";

/// Successful outcome of [`App::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The action ran; this is its result, uninterpreted.
    Returned(Value),
    /// A `dispatch:beforeException` listener returned `false`.
    Suppressed,
}

impl Dispatched {
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Dispatched::Suppressed)
    }

    /// The action result, `None` when the dispatch was suppressed.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Dispatched::Returned(value) => Some(value),
            Dispatched::Suppressed => None,
        }
    }
}

/// Application container and dispatcher.
///
/// Configuration methods (`set_*_suffix`, `set_default_namespace`,
/// `register_modules`) take `&mut self`. Everything a module or a running
/// action may need (services, listeners, controllers) takes `&self`, so an
/// `App` can be shared behind an `Arc` and dispatch concurrently.
pub struct App {
    container: Arc<Container>,
    events: ArcSwapOption<Arc<dyn EventsManager>>,
    modules: BTreeMap<String, ModuleDescriptor>,
    module_classes: ModuleRegistry,
    /// One cell per module name. An empty cell after a failed `register`
    /// lets the next dispatch retry.
    loaded_modules: DashMap<String, Arc<OnceCell<()>>>,
    controllers: DashMap<String, Arc<ControllerDef>>,
    default_namespace: Option<String>,
    controller_suffix: String,
    action_suffix: String,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::with_container(Arc::new(Container::new()))
    }

    /// Build an app over an existing service container.
    #[must_use]
    pub fn with_container(container: Arc<Container>) -> Self {
        Self {
            container,
            events: ArcSwapOption::empty(),
            modules: BTreeMap::new(),
            module_classes: ModuleRegistry::new(),
            loaded_modules: DashMap::new(),
            controllers: DashMap::new(),
            default_namespace: None,
            controller_suffix: DEFAULT_CONTROLLER_SUFFIX.to_string(),
            action_suffix: DEFAULT_ACTION_SUFFIX.to_string(),
        }
    }

    /// Build an app with suffixes, namespace and module table from
    /// configuration, backed by an in-process store.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_config_with(config, Arc::new(MemoryConnector::new()))
    }

    /// Like [`App::from_config`], opening the `db` connection through
    /// `connector`. A cookie encryption key registers the `crypt` service.
    #[must_use]
    pub fn from_config_with(config: &AppConfig, connector: Arc<dyn Connector>) -> Self {
        let mut app = Self::new();
        app.set_controller_suffix(config.app.controller_suffix.as_str())
            .set_action_suffix(config.app.action_suffix.as_str());
        if let Some(ns) = &config.app.default_namespace {
            app.set_default_namespace(ns.as_str());
        }
        app.register_modules(config.modules.clone());
        if let Some(key) = config.cookies.encryption_key.as_deref() {
            match AesCrypt::from_passphrase(key) {
                Ok(crypt) => {
                    app.set_shared("crypt", Arc::new(crypt) as Arc<dyn Crypt>);
                }
                Err(err) => warn!(error = %err, "Cookie encryption disabled"),
            }
        }
        let connection = Connection::new(
            config.server_config().clone(),
            config.database.db.as_str(),
            connector,
        );
        debug!(
            host = %config.server_config().host,
            db = %connection.db(),
            "Database connection configured"
        );
        app.set_shared("db", Arc::new(connection));
        app
    }

    /// Run a configuration callback against the app.
    pub fn initialize<F>(&mut self, callback: F) -> anyhow::Result<&mut Self>
    where
        F: FnOnce(&mut App) -> anyhow::Result<()>,
    {
        callback(self)?;
        Ok(self)
    }

    // ---- services -------------------------------------------------------

    /// The underlying service container.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn set(&self, key: impl Into<String>, service: Service) -> &Self {
        self.container.set(key, service);
        self
    }

    pub fn set_shared<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> &Self {
        self.container.set_shared(key, value);
        self
    }

    pub fn set_factory<T, F>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.container.set_factory(key, factory);
        self
    }

    pub fn register_services<I, K>(&self, services: I) -> &Self
    where
        I: IntoIterator<Item = (K, Service)>,
        K: Into<String>,
    {
        self.container.register_services(services);
        self
    }

    pub fn get<T: Any + Clone>(&self, key: &str) -> Result<T, ServiceError> {
        self.container.get(key)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.container.has(key)
    }

    // ---- events ---------------------------------------------------------

    pub fn set_events_manager(&self, manager: Arc<dyn EventsManager>) -> &Self {
        self.events.store(Some(Arc::new(manager)));
        self
    }

    #[must_use]
    pub fn events_manager(&self) -> Option<Arc<dyn EventsManager>> {
        self.events.load_full().map(|manager| Arc::clone(&*manager))
    }

    /// Attach a listener to every `dispatch:*` event.
    ///
    /// Installs a default [`Manager`] when no events manager was set.
    pub fn add_event(&self, listener: Arc<dyn Listener>) -> &Self {
        self.events_manager_or_default().attach("dispatch", listener);
        self
    }

    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) -> &Self {
        self.add_event(Arc::new(MiddlewareListener::new(middleware)))
    }

    fn events_manager_or_default(&self) -> Arc<dyn EventsManager> {
        if let Some(manager) = self.events_manager() {
            return manager;
        }
        let fresh: Arc<dyn EventsManager> = Arc::new(Manager::new());
        let previous = self
            .events
            .rcu(|current| current.clone().or_else(|| Some(Arc::new(Arc::clone(&fresh)))));
        match previous {
            Some(installed) => Arc::clone(&*installed),
            None => fresh,
        }
    }

    // ---- naming ---------------------------------------------------------

    pub fn set_controller_suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
        self.controller_suffix = suffix.into();
        self
    }

    pub fn set_action_suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
        self.action_suffix = suffix.into();
        self
    }

    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.default_namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn controller_suffix(&self) -> &str {
        &self.controller_suffix
    }

    #[must_use]
    pub fn action_suffix(&self) -> &str {
        &self.action_suffix
    }

    #[must_use]
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    // ---- modules and controllers ---------------------------------------

    /// Replace the module table.
    pub fn register_modules<I, K>(&mut self, modules: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, ModuleDescriptor)>,
        K: Into<String>,
    {
        self.modules = modules.into_iter().map(|(k, d)| (k.into(), d)).collect();
        info!(modules = ?self.modules.keys().collect::<Vec<_>>(), "Module table registered");
        self
    }

    #[must_use]
    pub fn modules(&self) -> &BTreeMap<String, ModuleDescriptor> {
        &self.modules
    }

    /// Make a module class resolvable by the `class_name` of a descriptor.
    pub fn register_module_class<M, F>(&self, class_name: impl Into<String>, factory: F) -> &Self
    where
        M: Module + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.module_classes.register(class_name, factory);
        self
    }

    #[must_use]
    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.loaded_modules
            .get(name)
            .is_some_and(|cell| cell.get().is_some())
    }

    pub fn register_controller(&self, controller: ControllerDef) -> &Self {
        debug!(
            controller = %controller.key(),
            actions = ?controller.action_names(),
            "Controller registered"
        );
        self.controllers
            .insert(controller.key().to_string(), Arc::new(controller));
        self
    }

    #[must_use]
    pub fn has_controller(&self, key: &str) -> bool {
        self.controllers.contains_key(key)
    }

    // ---- dispatch -------------------------------------------------------

    /// Route `uri` and run the matching controller action.
    ///
    /// Resolution failures are offered to `dispatch:beforeException` first;
    /// a listener returning exactly `false` turns them into
    /// [`Dispatched::Suppressed`]. Errors returned by the action itself are
    /// propagated as [`DispatchError::Action`] without consulting the hook.
    pub fn handle(&self, uri: Option<&str>) -> Result<Dispatched, DispatchError> {
        let span = info_span!(
            "dispatch",
            request_id = %DispatchId::new(),
            uri = uri.unwrap_or("/")
        );
        let _entered = span.enter();

        let router: Arc<dyn Router> = match self.container.get("router") {
            Ok(router) => router,
            Err(err) => {
                debug!(error = %err, "Router lookup failed");
                return self.raise(DispatchError::RouterNotRegistered);
            }
        };

        let route = router.handle(uri);
        self.container.set_shared("router", router);

        if let Some(module) = route.module_name.as_deref() {
            if let Some(descriptor) = self.modules.get(module) {
                if let Err(err) = self.load_module(module, descriptor) {
                    return self.raise(err);
                }
            }
        }

        let key = controller_key(
            &route.controller_name,
            &self.controller_suffix,
            self.default_namespace.as_deref(),
        );
        let controller = match self.controllers.get(&key) {
            Some(entry) => Arc::clone(entry.value()),
            None => return self.raise(DispatchError::ControllerNotFound { controller: key }),
        };

        let action_name = format!("{}{}", route.action_name, self.action_suffix);
        let Some(action) = controller.action(&action_name) else {
            return self.raise(DispatchError::ActionNotFound {
                controller: key,
                action: action_name,
            });
        };

        if let Some(manager) = self.events_manager() {
            manager.fire(BEFORE_EXECUTE_ROUTE, self, None);
        }

        debug!(
            controller = %key,
            action = %action_name,
            params = route.params.len(),
            "Invoking action"
        );
        action(self, &route.params)
            .map(Dispatched::Returned)
            .map_err(DispatchError::Action)
    }

    /// Offer `error` to `dispatch:beforeException`, then return it.
    fn raise(&self, error: DispatchError) -> Result<Dispatched, DispatchError> {
        if let Some(manager) = self.events_manager() {
            let status = manager.fire(BEFORE_EXCEPTION, self, Some(&error));
            if is_suppressed(&status) {
                warn!(kind = error.kind(), error = %error, "Dispatch error suppressed by listener");
                return Ok(Dispatched::Suppressed);
            }
        }
        Err(error)
    }

    fn load_module(&self, name: &str, descriptor: &ModuleDescriptor) -> Result<(), DispatchError> {
        let cell = Arc::clone(
            self.loaded_modules
                .entry(name.to_string())
                .or_default()
                .value(),
        );
        if cell.get().is_some() {
            debug!(module = %name, "Module already loaded");
            return Ok(());
        }
        // Concurrent dispatches for the same module block here until the
        // first registration finishes.
        cell.get_or_try_init(|| self.register_module(name, descriptor))
            .map(|_| ())
    }

    fn register_module(
        &self,
        name: &str,
        descriptor: &ModuleDescriptor,
    ) -> Result<(), DispatchError> {
        if !descriptor.path.exists() {
            return Err(DispatchError::ModuleNotFound {
                module: name.to_string(),
                reason: format!("{} not found", descriptor.path.display()),
            });
        }

        let Some(module) = self.module_classes.instantiate(&descriptor.class_name) else {
            return Err(DispatchError::ModuleNotFound {
                module: name.to_string(),
                reason: format!(
                    "{} class not found in {}",
                    descriptor.class_name,
                    descriptor.path.display()
                ),
            });
        };

        module
            .register(self)
            .map_err(|source| DispatchError::ModuleRegistration {
                module: name.to_string(),
                source,
            })?;
        info!(module = %name, class = %descriptor.class_name, "Module registered");
        Ok(())
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("container", &self.container)
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("controllers", &self.controllers.len())
            .field("default_namespace", &self.default_namespace)
            .field("controller_suffix", &self.controller_suffix)
            .field("action_suffix", &self.action_suffix)
            .finish()
    }
}
