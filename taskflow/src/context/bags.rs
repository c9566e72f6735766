//! Thread-safe append-only bags for secrets and unit outputs.

use crate::core::{Outputs, StringMap};
use crate::errors::{DataConflictError, OutputConflictError};
use parking_lot::RwLock;

/// An append-only bag of resolved secrets.
///
/// Writing a different value to an existing key raises a `DataConflictError`;
/// re-adding the same value is a no-op.
#[derive(Debug, Default)]
pub struct SecretBag {
    secrets: RwLock<StringMap>,
}

impl SecretBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a secret value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).map(ToString::to_string)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.secrets.read().contains_key(key)
    }

    /// Adds a secret.
    ///
    /// # Errors
    ///
    /// Returns `DataConflictError` if the key already holds a different value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), DataConflictError> {
        let key = key.into();
        let value = value.into();
        let mut secrets = self.secrets.write();

        match secrets.get(&key) {
            Some(existing) if existing == value => Ok(()),
            Some(_) => Err(DataConflictError::new(&key)),
            None => {
                secrets.insert(key, value);
                Ok(())
            }
        }
    }

    /// Returns secret keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.secrets.read().keys().map(ToString::to_string).collect()
    }

    /// Returns a copy of all secrets.
    #[must_use]
    pub fn snapshot(&self) -> StringMap {
        self.secrets.read().clone()
    }

    /// Returns the number of secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }
}

/// An append-only store of unit outputs keyed by unit id.
#[derive(Debug, Default)]
pub struct OutputStore {
    outputs: RwLock<Vec<(String, Outputs)>>,
}

impl OutputStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the outputs of a unit.
    #[must_use]
    pub fn get(&self, unit: &str) -> Option<Outputs> {
        self.outputs
            .read()
            .iter()
            .find(|(id, _)| id == unit)
            .map(|(_, o)| o.clone())
    }

    /// Gets a single output value of a unit.
    #[must_use]
    pub fn value(&self, unit: &str, key: &str) -> Option<serde_json::Value> {
        self.outputs
            .read()
            .iter()
            .find(|(id, _)| id == unit)
            .and_then(|(_, o)| o.get(key).cloned())
    }

    /// Checks if outputs exist for a unit.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        self.outputs.read().iter().any(|(id, _)| id == unit)
    }

    /// Records outputs for a unit.
    ///
    /// # Errors
    ///
    /// Returns `OutputConflictError` if the unit already has outputs.
    pub fn insert(&self, unit: impl Into<String>, outputs: Outputs) -> Result<(), OutputConflictError> {
        let unit = unit.into();
        let mut store = self.outputs.write();

        if store.iter().any(|(id, _)| *id == unit) {
            return Err(OutputConflictError::new(
                &unit,
                "outputs were already recorded in this run",
            ));
        }

        store.push((unit, outputs));
        Ok(())
    }

    /// Returns unit ids with outputs, in completion order.
    #[must_use]
    pub fn units(&self) -> Vec<String> {
        self.outputs.read().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Returns the number of units with outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.read().len()
    }

    /// Returns true if no outputs have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secret_bag_conflict() {
        let bag = SecretBag::new();
        bag.set("TOKEN", "abc").unwrap();
        bag.set("TOKEN", "abc").unwrap();

        let err = bag.set("TOKEN", "xyz").unwrap_err();
        assert_eq!(err.key, "TOKEN");
        assert_eq!(bag.get("TOKEN").as_deref(), Some("abc"));
    }

    #[test]
    fn test_secret_bag_order() {
        let bag = SecretBag::new();
        bag.set("B", "2").unwrap();
        bag.set("A", "1").unwrap();

        assert_eq!(bag.keys(), vec!["B", "A"]);
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_output_store_insert_and_get() {
        let store = OutputStore::new();
        store.insert("build", Outputs::new().with("image", "app:1")).unwrap();

        assert!(store.contains("build"));
        assert_eq!(store.value("build", "image"), Some(json!("app:1")));
        assert_eq!(store.value("build", "missing"), None);
        assert_eq!(store.get("test"), None);
    }

    #[test]
    fn test_output_store_is_append_only() {
        let store = OutputStore::new();
        store.insert("build", Outputs::new().with("x", 1)).unwrap();

        let err = store.insert("build", Outputs::new().with("x", 2)).unwrap_err();
        assert_eq!(err.unit, "build");
        assert_eq!(store.value("build", "x"), Some(json!(1)));
    }

    #[test]
    fn test_output_store_units_in_completion_order() {
        let store = OutputStore::new();
        store.insert("b", Outputs::new()).unwrap();
        store.insert("a", Outputs::new()).unwrap();

        assert_eq!(store.units(), vec!["b", "a"]);
    }
}
