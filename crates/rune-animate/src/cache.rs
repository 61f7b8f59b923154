//! Memo of animations known to have no duration.
//!
//! Drivers record what they learned about an element/event/class combination;
//! the engine consults the cache right before dispatching a unit and closes it
//! without consulting any driver when the combination is known to be a no-op.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::document::{Document, ElementId};

/// Cache consulted by the engine before invoking drivers.
pub trait AnimationCache {
    /// Build the key for an element about to run `event`.
    fn cache_key(
        &self,
        doc: &Document,
        element: ElementId,
        event: &str,
        add_class: Option<&str>,
        remove_class: Option<&str>,
    ) -> String;

    /// Whether `key` is known to produce a zero-duration animation.
    fn contains_cached_animation_without_duration(&self, key: &str) -> bool;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    total: usize,
    value: serde_json::Value,
    is_valid: bool,
}

/// Default [`AnimationCache`]: a map of key to driver supplied value, where
/// `is_valid == false` marks a zero-duration animation.
#[derive(Debug, Default)]
pub struct AnimateCache {
    entries: RefCell<HashMap<String, CacheEntry>>,
}

impl AnimateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value for `key`. Repeated puts bump the hit count and replace
    /// the value but keep the first validity verdict.
    pub fn put(&self, key: &str, value: serde_json::Value, is_valid: bool) {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.total += 1;
                entry.value = value;
            }
            None => {
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        total: 1,
                        value,
                        is_valid,
                    },
                );
            }
        }
    }

    /// Stored value for `key`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.borrow().get(key).map(|e| e.value.clone())
    }

    /// How many times `key` was recorded.
    pub fn count(&self, key: &str) -> usize {
        self.entries.borrow().get(key).map_or(0, |e| e.total)
    }

    /// Drop every entry.
    pub fn flush(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl AnimationCache for AnimateCache {
    fn cache_key(
        &self,
        doc: &Document,
        element: ElementId,
        event: &str,
        add_class: Option<&str>,
        remove_class: Option<&str>,
    ) -> String {
        // Siblings sharing a parent and classes animate identically.
        let parent = doc
            .parent(element)
            .and_then(|p| doc.serial(p))
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        let mut parts = vec![parent, event.to_string(), doc.classes(element).to_string()];
        parts.extend(add_class.filter(|c| !c.is_empty()).map(str::to_string));
        parts.extend(remove_class.filter(|c| !c.is_empty()).map(str::to_string));
        parts.join(" ")
    }

    fn contains_cached_animation_without_duration(&self, key: &str) -> bool {
        self.entries
            .borrow()
            .get(key)
            .is_some_and(|entry| !entry.is_valid)
    }
}
