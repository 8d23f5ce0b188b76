#![forbid(unsafe_code)]

//! Ordered string-keyed map.
//!
//! Iteration follows insertion order; re-inserting an existing key replaces
//! the value in place. Equality ignores order, like any map.

use ahash::RandomState;
use indexmap::IndexMap;

/// Insertion-ordered map from names to values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDict<V> {
    entries: IndexMap<String, V, RandomState>,
}

impl<V> Default for ObjectDict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ObjectDict<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::with_hasher(RandomState::new()),
        }
    }

    /// Insert or replace. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for ObjectDict<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}

impl<V> std::ops::Index<&str> for ObjectDict<V> {
    type Output = V;

    fn index(&self, key: &str) -> &V {
        &self.entries[key]
    }
}
