//! Ordered registries of declared units.

use super::{Unit, UnitBuilder};
use crate::errors::{UnitValidationError, UnknownDependencyError};
use std::collections::HashMap;
use std::sync::Arc;

/// A named registry of units, iterated in declaration order.
///
/// Declaring an id twice replaces the earlier unit; the id keeps its
/// original position. Units are shared by `Arc`, so splicing a unit from
/// another map does not copy it.
#[derive(Debug, Clone, Default)]
pub struct UnitMap {
    units: HashMap<String, Arc<Unit>>,
    order: Vec<String>,
}

/// A map of tasks.
pub type TaskMap = UnitMap;

/// A map of job steps.
pub type JobMap = UnitMap;

impl UnitMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a built unit, returning the one it replaced.
    pub fn insert(&mut self, unit: Unit) -> Option<Arc<Unit>> {
        self.insert_shared(Arc::new(unit))
    }

    /// Registers a shared unit, returning the one it replaced.
    pub fn insert_shared(&mut self, unit: Arc<Unit>) -> Option<Arc<Unit>> {
        let id = unit.id().to_string();
        let previous = self.units.insert(id.clone(), unit);
        if previous.is_none() {
            self.order.push(id);
        } else {
            tracing::debug!(unit = %id, "Unit redeclared; last declaration wins");
        }
        previous
    }

    /// Builds and registers a unit.
    ///
    /// # Errors
    ///
    /// Returns the builder's validation error.
    pub fn declare(&mut self, builder: UnitBuilder) -> Result<&mut Self, UnitValidationError> {
        self.insert(builder.build()?);
        Ok(self)
    }

    /// References a unit declared in `other`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDependencyError` if `other` has no unit `id`.
    pub fn add_from(&mut self, other: &UnitMap, id: &str) -> Result<&mut Self, UnknownDependencyError> {
        let unit = other
            .get(id)
            .cloned()
            .ok_or_else(|| UnknownDependencyError::target(id))?;
        self.insert_shared(unit);
        Ok(self)
    }

    /// Removes a unit.
    pub fn remove(&mut self, id: &str) -> Option<Arc<Unit>> {
        let removed = self.units.remove(id);
        if removed.is_some() {
            self.order.retain(|o| o != id);
        }
        removed
    }

    /// Registers every unit of `other`, in its order.
    pub fn merge(&mut self, other: &UnitMap) {
        for (_, unit) in other.iter() {
            self.insert_shared(unit.clone());
        }
    }

    /// Gets a unit.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Unit>> {
        self.units.get(id)
    }

    /// Checks if a unit is declared.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Returns unit ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Iterates units in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Unit>)> {
        self.order
            .iter()
            .filter_map(|id| self.units.get(id).map(|u| (id.as_str(), u)))
    }

    /// Returns the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<Unit> for UnitMap {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        let mut map = Self::new();
        for unit in iter {
            map.insert(unit);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit(id: &str, handler: &str) -> Unit {
        Unit::builder(id).uses(handler).build().unwrap()
    }

    #[test]
    fn test_preserves_declaration_order() {
        let map: UnitMap = [unit("c", "h"), unit("a", "h"), unit("b", "h")]
            .into_iter()
            .collect();
        assert_eq!(map.ids().collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_redeclare_last_wins_and_keeps_position() {
        let mut map = UnitMap::new();
        map.insert(unit("a", "first"));
        map.insert(unit("b", "h"));
        let previous = map.insert(unit("a", "second"));

        assert!(previous.is_some());
        assert_eq!(map.len(), 2);
        assert_eq!(map.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a").unwrap().action().uses(), Some("second"));
    }

    #[test]
    fn test_declare_propagates_validation_error() {
        let mut map = UnitMap::new();
        assert!(map.declare(Unit::builder("a")).is_err());
        assert!(map.is_empty());

        map.declare(Unit::builder("a").uses("h")).unwrap();
        assert!(map.contains("a"));
    }

    #[test]
    fn test_add_from_shares_unit() {
        let mut shared = UnitMap::new();
        shared.insert(unit("load-vault", "vault"));

        let mut local = UnitMap::new();
        local.add_from(&shared, "load-vault").unwrap();

        assert!(Arc::ptr_eq(
            local.get("load-vault").unwrap(),
            shared.get("load-vault").unwrap()
        ));
        assert!(local.add_from(&shared, "missing").is_err());
    }

    #[test]
    fn test_remove_and_merge() {
        let mut a: UnitMap = [unit("x", "h"), unit("y", "h")].into_iter().collect();
        let b: UnitMap = [unit("z", "h"), unit("x", "other")].into_iter().collect();

        a.merge(&b);
        assert_eq!(a.ids().collect::<Vec<_>>(), vec!["x", "y", "z"]);
        assert_eq!(a.get("x").unwrap().action().uses(), Some("other"));

        assert!(a.remove("y").is_some());
        assert!(a.remove("y").is_none());
        assert_eq!(a.ids().collect::<Vec<_>>(), vec!["x", "z"]);
    }
}
