//! Insert-only registry for keys that must be unique.
//!
//! Unlike the correlation indices, a second insertion under the same key is
//! a logic error and is reported instead of merged.

use crate::utils::error::ModelError;
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct UniqueRegistry<K> {
    kind: &'static str,
    keys: HashSet<K>,
}

impl<K: Eq + Hash + Display> UniqueRegistry<K> {
    /// `kind` names the entity in error messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            keys: HashSet::new(),
        }
    }

    /// # Errors
    /// * `ModelError::DuplicateKey` - `key` is already registered
    pub fn insert(&mut self, key: K) -> Result<(), ModelError> {
        if self.keys.contains(&key) {
            return Err(ModelError::DuplicateKey {
                kind: self.kind,
                key: key.to_string(),
            });
        }

        self.keys.insert(key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_insert_is_an_error() {
        let mut registry = UniqueRegistry::new("rule set");
        registry.insert("rs-1".to_string()).unwrap();

        let err = registry.insert("rs-1".to_string()).unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateKey {
                kind: "rule set",
                key: "rs-1".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "cannot insert, already exists: rule set id = rs-1"
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_keys_are_accepted() {
        let mut registry = UniqueRegistry::new("worklet");
        assert!(registry.is_empty());
        registry.insert("a".to_string()).unwrap();
        registry.insert("b".to_string()).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
