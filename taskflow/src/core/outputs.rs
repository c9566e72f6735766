//! Ordered key/value outputs produced by a unit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The result every unit action returns.
pub type ActionResult = Result<Outputs, crate::errors::UnitError>;

/// Insertion-ordered outputs of a unit.
///
/// Keys keep the order in which the action produced them, so rendered
/// reports are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs(Map<String, Value>);

impl Outputs {
    /// Creates empty outputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, returning the outputs for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, returning the previous one for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a value as a string slice.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merges `other` over these outputs.
    pub fn merge(&mut self, other: Self) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Outputs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Outputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Outputs {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outputs_preserve_insertion_order() {
        let outputs = Outputs::new().with("zeta", 1).with("alpha", 2).with("mid", 3);
        let keys: Vec<_> = outputs.keys().cloned().collect();

        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_outputs_get_str() {
        let outputs = Outputs::new().with("image", "app:1.2").with("count", 3);

        assert_eq!(outputs.get_str("image"), Some("app:1.2"));
        assert_eq!(outputs.get_str("count"), None);
        assert_eq!(outputs.get("count"), Some(&json!(3)));
    }

    #[test]
    fn test_outputs_merge_overrides() {
        let mut base = Outputs::new().with("a", 1).with("b", 2);
        base.merge(Outputs::new().with("b", 20).with("c", 30));

        assert_eq!(base.get("b"), Some(&json!(20)));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_outputs_serialize_as_object() {
        let outputs: Outputs = [("x", 1)].into_iter().collect();
        assert_eq!(serde_json::to_value(&outputs).unwrap(), json!({"x": 1}));
    }
}
