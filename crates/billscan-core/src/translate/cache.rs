//! Bounded in-memory translation cache.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

type CacheKey = (String, String);

/// Bounded translation cache keyed by (text, target language).
///
/// When full, the entry inserted first is evicted.
#[derive(Debug, Clone)]
pub struct TranslationCache {
    capacity: usize,
    entries: HashMap<CacheKey, String>,
    order: VecDeque<CacheKey>,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, text: &str, target: &str) -> Option<&str> {
        self.entries
            .get(&(text.to_string(), target.to_string()))
            .map(String::as_str)
    }

    /// Store a translation. Re-inserting an existing key updates the value
    /// without changing its eviction position.
    pub fn insert(&mut self, text: &str, target: &str, translation: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }

        let key = (text.to_string(), target.to_string());
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = translation.into();
            return;
        }

        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            trace!("Evicting cached translation of {:?}", oldest.0);
            self.entries.remove(&oldest);
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, translation.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
