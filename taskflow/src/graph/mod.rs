//! Dependency graph resolution.
//!
//! Resolution runs before anything executes: an unknown dependency or a
//! cycle aborts the run with no unit started.

mod resolver;

pub use resolver::GraphResolver;
