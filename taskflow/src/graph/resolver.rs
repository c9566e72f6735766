//! Dependency resolution.

use crate::errors::{CycleDetectedError, TaskflowError, UnknownDependencyError};
use crate::units::UnitMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Computes execution orders from a [`UnitMap`].
///
/// Depth-first from each target, placing a unit after all of its `needs`.
/// Targets and `needs` are walked in declaration order, so identical input
/// always yields the same order.
#[derive(Debug)]
pub struct GraphResolver<'a> {
    map: &'a UnitMap,
    marks: HashMap<&'a str, Mark>,
    path: Vec<&'a str>,
    order: Vec<String>,
}

impl<'a> GraphResolver<'a> {
    fn new(map: &'a UnitMap) -> Self {
        Self {
            map,
            marks: HashMap::new(),
            path: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Resolves the units needed to run `targets`, in execution order.
    ///
    /// Only units reachable from a target are included.
    ///
    /// # Errors
    ///
    /// - `UnknownDependency` if a target or a reachable `needs` entry is not declared
    /// - `CycleDetected` with the full cycle path
    pub fn resolve<S: AsRef<str>>(
        map: &'a UnitMap,
        targets: impl IntoIterator<Item = S>,
    ) -> Result<Vec<String>, TaskflowError> {
        let mut resolver = Self::new(map);
        for target in targets {
            let target = target.as_ref();
            let unit = map
                .get(target)
                .ok_or_else(|| UnknownDependencyError::target(target))?;
            resolver.visit(unit.id())?;
        }

        tracing::debug!(order = ?resolver.order, "Resolved execution order");
        Ok(resolver.order)
    }

    /// Resolves every unit of the map, using declaration order as targets.
    ///
    /// # Errors
    ///
    /// Same as [`GraphResolver::resolve`].
    pub fn resolve_all(map: &'a UnitMap) -> Result<Vec<String>, TaskflowError> {
        Self::resolve(map, map.ids())
    }

    fn visit(&mut self, id: &'a str) -> Result<(), TaskflowError> {
        match self.marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = self.path.iter().position(|p| *p == id).unwrap_or(0);
                let mut cycle: Vec<String> = self.path[start..].iter().map(ToString::to_string).collect();
                cycle.push(id.to_string());
                return Err(CycleDetectedError::new(cycle).into());
            }
            None => {}
        }

        let map = self.map;
        let unit = map.get(id).ok_or_else(|| UnknownDependencyError::target(id))?;

        self.marks.insert(id, Mark::InProgress);
        self.path.push(id);

        for need in unit.needs() {
            if !map.contains(need) {
                return Err(UnknownDependencyError::new(id, need.as_str()).into());
            }
            self.visit(need)?;
        }

        self.path.pop();
        self.marks.insert(id, Mark::Done);
        self.order.push(id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;
    use pretty_assertions::assert_eq;

    fn map(units: &[(&str, &[&str])]) -> UnitMap {
        units
            .iter()
            .map(|(id, needs)| {
                Unit::builder(*id)
                    .needs(needs.iter().copied())
                    .uses("noop")
                    .build()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_linear_chain() {
        let m = map(&[("deploy", &["test"]), ("test", &["build"]), ("build", &[])]);
        let order = GraphResolver::resolve(&m, ["deploy"]).unwrap();
        assert_eq!(order, vec!["build", "test", "deploy"]);
    }

    #[test]
    fn test_diamond_is_deduplicated_and_stable() {
        let m = map(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);

        let first = GraphResolver::resolve(&m, ["d"]).unwrap();
        let second = GraphResolver::resolve(&m, ["d"]).unwrap();
        assert_eq!(first, vec!["a", "b", "c", "d"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_needs_order_breaks_ties() {
        let m = map(&[("x", &[]), ("y", &[]), ("z", &["y", "x"])]);
        assert_eq!(GraphResolver::resolve(&m, ["z"]).unwrap(), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_multiple_targets_share_dependencies() {
        let m = map(&[("build", &[]), ("lint", &["build"]), ("test", &["build"])]);
        let order = GraphResolver::resolve(&m, ["test", "lint", "test"]).unwrap();
        assert_eq!(order, vec!["build", "test", "lint"]);
    }

    #[test]
    fn test_only_reachable_units() {
        let m = map(&[("a", &[]), ("b", &[]), ("c", &["a"])]);
        assert_eq!(GraphResolver::resolve(&m, ["c"]).unwrap(), vec!["a", "c"]);
        assert_eq!(GraphResolver::resolve_all(&m).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_two_node_cycle() {
        let m = map(&[("a", &["b"]), ("b", &["a"])]);
        let err = GraphResolver::resolve(&m, ["a"]).unwrap_err();
        match err {
            TaskflowError::CycleDetected(e) => assert_eq!(e.cycle_path, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_path_excludes_entry_prefix() {
        let m = map(&[("root", &["a"]), ("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let err = GraphResolver::resolve(&m, ["root"]).unwrap_err();
        assert_eq!(err.to_string(), "Cycle detected: a -> b -> c -> a");
    }

    #[test]
    fn test_unknown_dependency() {
        let m = map(&[("test", &["build"])]);
        match GraphResolver::resolve(&m, ["test"]).unwrap_err() {
            TaskflowError::UnknownDependency(e) => {
                assert_eq!(e.dependent.as_deref(), Some("test"));
                assert_eq!(e.missing, "build");
            }
            other => panic!("expected unknown dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_target() {
        let m = map(&[("a", &[])]);
        match GraphResolver::resolve(&m, ["nope"]).unwrap_err() {
            TaskflowError::UnknownDependency(e) => {
                assert_eq!(e.dependent, None);
                assert_eq!(e.missing, "nope");
            }
            other => panic!("expected unknown target, got {other:?}"),
        }
    }
}
