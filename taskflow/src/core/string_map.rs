//! Ordered string-to-string map used for environment and secrets.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// An insertion-ordered map of strings.
///
/// Overwriting a key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringMap {
    entries: HashMap<String, String>,
    order: Vec<String>,
}

impl StringMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let previous = self.entries.insert(key.clone(), value.into());
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    /// Copies every entry of `other` over this map.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k.as_str(), v.as_str())))
    }

    /// Returns keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(_, v)| v)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for StringMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl Serialize for StringMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overwrite_keeps_position() {
        let mut map: StringMap = [("PATH", "/bin"), ("HOME", "/root")].into_iter().collect();
        let previous = map.insert("PATH", "/usr/bin");

        assert_eq!(previous.as_deref(), Some("/bin"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["PATH", "HOME"]);
        assert_eq!(map.get("PATH"), Some("/usr/bin"));
    }

    #[test]
    fn test_merge_and_remove() {
        let mut base: StringMap = [("A", "1")].into_iter().collect();
        let overrides: StringMap = [("B", "2"), ("A", "10")].into_iter().collect();
        base.merge(&overrides);

        assert_eq!(base.get("A"), Some("10"));
        assert_eq!(base.len(), 2);

        assert_eq!(base.remove("A").as_deref(), Some("10"));
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_serializes_in_order() {
        let map: StringMap = [("z", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"z":"1","a":"2"}"#);
    }
}
