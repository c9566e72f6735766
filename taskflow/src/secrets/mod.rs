//! Secret tracking and redaction.
//!
//! Every string the engine hands to a `Writer` passes through a
//! [`SecretMasker`] first.

mod masker;

pub use masker::{generators, SecretGenerator, SecretMasker, MASK};
