//! # Service Container
//!
//! A registry mapping string keys to either shared values or factories that
//! are invoked on every access.
//!
//! ## Overview
//!
//! Components never reach for globals: the router, the session store, the
//! crypt and filter services and the database connection are all looked up
//! here by key. Values are stored type-erased and recovered with
//! [`Container::get`], which reports a missing key and a value of the wrong
//! type as distinct [`ServiceError`]s.
//!
//! ```rust
//! use mvcore::container::Container;
//! use std::sync::Arc;
//!
//! let container = Container::new();
//! container.set_shared("greeting", Arc::new(String::from("hello")));
//! container.set_factory("answer", |_| 42_u32);
//!
//! let greeting: Arc<String> = container.get("greeting").unwrap();
//! assert_eq!(greeting.as_str(), "hello");
//! assert_eq!(container.get::<u32>("answer").unwrap(), 42);
//! ```
//!
//! ## Factories
//!
//! Factories are not memoized. A factory that needs singleton semantics must
//! cache internally. Factories receive the container itself, so they may
//! resolve their own dependencies; the entry is cloned out of the map before
//! the factory runs, which keeps re-entrant lookups from deadlocking.

use dashmap::DashMap;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type SharedValue = Arc<dyn Any + Send + Sync>;
type FactoryFn = Arc<dyn Fn(&Container) -> SharedValue + Send + Sync>;

/// One registry entry.
#[derive(Clone)]
pub enum Service {
    /// A concrete value handed out by clone on every lookup.
    Shared(SharedValue),
    /// A factory invoked on every lookup.
    Factory(FactoryFn),
}

impl Service {
    /// Wrap a concrete value.
    pub fn shared<T: Any + Send + Sync>(value: T) -> Self {
        Service::Shared(Arc::new(value))
    }

    /// Wrap a factory.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Service::Factory(Arc::new(move |c: &Container| -> SharedValue {
            Arc::new(factory(c))
        }))
    }

    /// Whether this entry is backed by a factory.
    #[must_use]
    pub fn is_factory(&self) -> bool {
        matches!(self, Service::Factory(_))
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Shared(_) => f.write_str("Service::Shared"),
            Service::Factory(_) => f.write_str("Service::Factory"),
        }
    }
}

/// Service lookup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Nothing is registered under the key.
    NotRegistered {
        /// The requested key
        key: String,
    },
    /// A value is registered but it is not of the requested type.
    WrongType {
        /// The requested key
        key: String,
        /// The type the caller asked for
        expected: &'static str,
    },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotRegistered { key } => {
                write!(f, "Service '{key}' was not registered")
            }
            ServiceError::WrongType { key, expected } => {
                write!(f, "Service '{key}' is not a {expected}")
            }
        }
    }
}

impl std::error::Error for ServiceError {}

/// Concurrent string-keyed service registry.
#[derive(Default)]
pub struct Container {
    services: DashMap<String, Service>,
}

impl Container {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an entry.
    pub fn set(&self, key: impl Into<String>, service: Service) -> &Self {
        let key = key.into();
        debug!(service = %key, factory = service.is_factory(), "Service registered");
        self.services.insert(key, service);
        self
    }

    /// Register a concrete value.
    pub fn set_shared<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> &Self {
        self.set(key, Service::shared(value))
    }

    /// Register a factory invoked on every lookup.
    pub fn set_factory<T, F>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.set(key, Service::factory(factory))
    }

    /// Register every entry of `services`.
    pub fn register_services<I, K>(&self, services: I) -> &Self
    where
        I: IntoIterator<Item = (K, Service)>,
        K: Into<String>,
    {
        for (key, service) in services {
            self.set(key, service);
        }
        self
    }

    /// Whether anything is registered under `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.services.contains_key(key)
    }

    /// Remove an entry, returning it when present.
    pub fn remove(&self, key: &str) -> Option<Service> {
        self.services.remove(key).map(|(_, service)| service)
    }

    /// Resolve an entry to its type-erased value, invoking factories.
    pub fn resolve(&self, key: &str) -> Result<SharedValue, ServiceError> {
        // Clone out of the shard before running a factory that may re-enter.
        let service = self
            .services
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotRegistered {
                key: key.to_string(),
            })?;
        Ok(match service {
            Service::Shared(value) => value,
            Service::Factory(factory) => factory(self),
        })
    }

    /// Resolve an entry and clone it out as `T`.
    ///
    /// Trait objects are registered as `Arc<dyn Trait>` and requested the
    /// same way: `container.get::<Arc<dyn Router>>("router")`.
    pub fn get<T: Any + Clone>(&self, key: &str) -> Result<T, ServiceError> {
        let value = self.resolve(key)?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ServiceError::WrongType {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Like [`Container::get`] but treats a missing key as `None`.
    ///
    /// A registered value of the wrong type is still an error.
    pub fn get_optional<T: Any + Clone>(&self, key: &str) -> Result<Option<T>, ServiceError> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(ServiceError::NotRegistered { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Registered keys, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.services.iter().map(|e| e.key().clone()).collect()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.keys())
            .finish()
    }
}
