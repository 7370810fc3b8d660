use super::{CachedValue, QueryCache};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Unbounded in-process cache. Entries live until [`clear`](Self::clear).
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<(String, String), CachedValue>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl QueryCache for MemoryCache {
    fn get(&self, scope: &str, key: &str) -> Option<CachedValue> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(scope.to_string(), key.to_string()))
            .cloned()
    }

    fn put(&self, scope: &str, key: &str, value: CachedValue) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((scope.to_string(), key.to_string()), value);
    }
}
