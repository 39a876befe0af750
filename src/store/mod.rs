//! Shared configuration store.
//!
//! # Responsibilities
//! - Hold the merged values written by every registered loader
//! - Serve lock-free reads to hooks and application code
//!
//! # Design Decisions
//! - Backed by `ArcSwap`: readers get an immutable snapshot, writers swap a new map in
//! - Merges use read-copy-update, so concurrent loaders never drop each other's keys
//! - Later writes win per key; keys absent from a merge are left untouched

pub mod values;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use values::{Value, Values};

/// Cheaply clonable handle to the shared configuration values.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<ArcSwap<Values>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.load().get(key).cloned()
    }

    /// Get the current immutable snapshot of every value.
    pub fn snapshot(&self) -> Arc<Values> {
        self.inner.load_full()
    }

    /// Set a single value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.inner.rcu(|current| {
            let mut next = Values::clone(current);
            next.set(key.clone(), value.clone());
            next
        });
    }

    /// Merge loaded values into the store, overwriting keys that already exist.
    pub fn merge(&self, values: Values) {
        if values.is_empty() {
            return;
        }
        self.inner.rcu(|current| {
            let mut next = Values::clone(current);
            for (key, value) in &values {
                next.set(key.clone(), value.clone());
            }
            next
        });
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Drop every stored value.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset(&self) {
        self.inner.store(Arc::new(Values::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_and_keeps() {
        let store = Store::new();
        store.set("a", 1);
        store.set("b", 1);

        let update: Values = [("b", 2), ("c", 3)].into_iter().collect();
        store.merge(update);

        assert_eq!(store.get("a"), Some(Value::from(1)));
        assert_eq!(store.get("b"), Some(Value::from(2)));
        assert_eq!(store.get("c"), Some(Value::from(3)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let store = Store::new();
        let handle = store.clone();
        handle.set("shared", true);

        assert_eq!(store.get("shared"), Some(Value::Bool(true)));

        store.reset();
        assert!(handle.is_empty());
    }

    #[test]
    fn test_concurrent_merges_keep_all_keys() {
        let store = Store::new();
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let mut values = Values::new();
                        values.set(format!("loader{i}.key{j}"), j);
                        store.merge(values);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(store.len(), 8 * 50);
    }
}
