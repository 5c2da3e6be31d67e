use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::App;

/// A module registers its services and controllers when first routed to.
pub trait Module: Send + Sync {
    fn register(&self, app: &App) -> anyhow::Result<()>;
}

/// Where a module lives and which registered class implements it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub path: PathBuf,
    pub class_name: String,
}

impl ModuleDescriptor {
    pub fn new(path: impl Into<PathBuf>, class_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            class_name: class_name.into(),
        }
    }
}

type ModuleFactory = Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// Module classes by name.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: DashMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M, F>(&self, class_name: impl Into<String>, factory: F)
    where
        M: Module + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.factories.insert(
            class_name.into(),
            Arc::new(move || Box::new(factory()) as Box<dyn Module>),
        );
    }

    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Instantiate the module class, `None` when it was never registered.
    #[must_use]
    pub fn instantiate(&self, class_name: &str) -> Option<Box<dyn Module>> {
        let factory = self
            .factories
            .get(class_name)
            .map(|entry| Arc::clone(entry.value()))?;
        Some(factory())
    }
}
