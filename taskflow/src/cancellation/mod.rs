//! Cooperative cancellation.
//!
//! Each run owns a root [`CancellationToken`]; every unit receives a child
//! token that the executor cancels when the unit's timeout expires.

mod token;

pub use token::{CancelCallback, CancellationToken};
