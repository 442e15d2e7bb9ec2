//! In-memory key-value store

use super::KeyValueStore;
use std::collections::HashMap;
use std::sync::Mutex;

/// `HashMap`-backed store. The default for tests and for integrations that
/// re-register products on every process start anyway.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().expect("memory store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .expect("memory store poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("memory store poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.values.lock().expect("memory store poisoned").remove(key);
    }
}
