use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::StateStore;
use crate::errors::Result;

/// Process-local store, for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    values: Mutex<HashMap<String, Value>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        self.values().insert(key.to_string(), value.clone());
        Ok(())
    }
}
