//! Keyed correlation indices.
//!
//! Entities are discovered in different events at different times; these
//! maps join them afterwards regardless of arrival order. Each relationship
//! gets its own index so keys from different namespaces never collide.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Identity of a script: script ids are only unique within an isolate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScriptKey {
    pub script_id: u64,
    pub isolate: String,
}

impl ScriptKey {
    pub fn new(script_id: u64, isolate: impl Into<String>) -> Self {
        Self {
            script_id,
            isolate: isolate.into(),
        }
    }
}

impl fmt::Display for ScriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.script_id, self.isolate)
    }
}

/// Identity of a resolved execution context within an isolate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub context_id: i64,
    pub isolate: String,
}

impl ContextKey {
    pub fn new(context_id: i64, isolate: impl Into<String>) -> Self {
        Self {
            context_id,
            isolate: isolate.into(),
        }
    }
}

/// One correlation relationship, `K -> V`
#[derive(Debug, Clone)]
pub struct KeyedCorrelationIndex<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> KeyedCorrelationIndex<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Record a correlation, replacing any earlier value for `key`
    pub fn set(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Record a correlation only if `key` has none yet
    ///
    /// # Returns
    /// `true` if the value was stored
    pub fn set_if_absent(&mut self, key: K, value: V) -> bool {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

impl<K: Eq + Hash, V> Default for KeyedCorrelationIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_ids_are_scoped_per_isolate() {
        let a = ScriptKey::new(1, "iso-a");
        let b = ScriptKey::new(1, "iso-b");
        assert_ne!(a, b);

        let mut index = KeyedCorrelationIndex::new();
        index.set(a.clone(), "first");
        index.set(b.clone(), "second");
        assert_eq!(index.get(&a), Some(&"first"));
        assert_eq!(index.get(&b), Some(&"second"));
    }

    #[test]
    fn test_set_overwrites_and_set_if_absent_keeps() {
        let mut index = KeyedCorrelationIndex::new();
        index.set("k", 1);
        index.set("k", 2);
        assert_eq!(index.get(&"k"), Some(&2));

        assert!(!index.set_if_absent("k", 3));
        assert_eq!(index.get(&"k"), Some(&2));
        assert!(index.set_if_absent("j", 4));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(ScriptKey::new(7, "iso").to_string(), "7@iso");
    }
}
