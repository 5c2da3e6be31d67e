use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Session storage used to persist cookie attributes between requests.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn remove(&self, key: &str);

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySession {
    data: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.data.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.data.write().remove(key);
    }

    fn has(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }
}
