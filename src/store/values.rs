//! Snapshot of configuration values produced by a single load attempt.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

/// A single configuration value.
pub type Value = serde_json::Value;

/// Key/value pairs handed to a loader on each attempt.
///
/// Keys are flat, dot-separated paths (`server.port`). Ordering is stable so two
/// `Values` compare equal when they hold the same pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values {
    inner: BTreeMap<String, Value>,
}

impl Values {
    /// Create an empty set of values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value for the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.insert(key.into(), value.into());
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.inner.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Values
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Values {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a Values {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a: Values = [("b", 2), ("a", 1)].into_iter().collect();
        let mut b = Values::new();
        b.set("a", 1);
        b.set("b", 2);

        assert_eq!(a, b);
        assert_eq!(Values::new(), Values::default());
    }

    #[test]
    fn test_set_overwrites() {
        let mut values = Values::new();
        values.set("server.port", 8080);
        values.set("server.port", "9090");

        assert_eq!(values.len(), 1);
        assert_eq!(values.get("server.port"), Some(&Value::from("9090")));
    }
}
