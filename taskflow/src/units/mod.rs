//! Unit declarations and the maps that hold them.

mod map;
mod unit;

pub use map::{JobMap, TaskMap, UnitMap};
pub use unit::{Delegate, HandlerRef, Predicate, Unit, UnitAction, UnitBuilder};
