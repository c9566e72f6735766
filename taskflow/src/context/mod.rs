//! Run context propagation.
//!
//! A [`RunContext`] holds what every unit of a run shares: the environment
//! seed, resolved secrets, accumulated outputs, the cancellation token and
//! the masking writer. Each action receives a [`UnitContext`], a unit-scoped
//! view over it.

mod bags;
mod run;
mod unit;

pub use bags::{OutputStore, SecretBag};
pub use run::RunContext;
pub use unit::UnitContext;
