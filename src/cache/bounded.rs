use super::{CachedValue, QueryCache};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Cache keeping at most `capacity` entries, evicting the least recently
/// used one.
pub struct LruQueryCache {
    entries: Mutex<LruCache<(String, String), CachedValue>>,
}

impl LruQueryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
    }
}

impl QueryCache for LruQueryCache {
    fn get(&self, scope: &str, key: &str) -> Option<CachedValue> {
        // `get` moves the entry to the front, so even reads need the lock.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(scope.to_string(), key.to_string()))
            .cloned()
    }

    fn put(&self, scope: &str, key: &str, value: CachedValue) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put((scope.to_string(), key.to_string()), value);
    }
}
