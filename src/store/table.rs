//! KeyValueStore implementation
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::{DuraError, Result};

/// Concurrency-safe mapping from key to value
///
/// Last write wins. Deleting an absent key is a no-op.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    data: RwLock<HashMap<String, String>>,
}

impl KeyValueStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or overwrite the value for `key` (write lock)
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.write().insert(key.into(), value.into());
    }

    /// Get the value for `key` (read lock)
    ///
    /// Returns [`DuraError::NoSuchKey`] when the key is absent.
    pub fn get(&self, key: &str) -> Result<String> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or(DuraError::NoSuchKey)
    }

    /// Remove `key` if present (write lock)
    pub fn delete(&self, key: &str) {
        self.data.write().remove(key);
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Ordered copy of the current contents
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
