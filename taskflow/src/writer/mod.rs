//! Observability sink for run progress.
//!
//! The engine reports unit progress through a [`Writer`]. Every string it
//! passes has already been masked; [`MaskedWriter`] is how that guarantee is
//! kept.

mod masked;
mod sink;

pub use masked::MaskedWriter;
pub use sink::{CollectingWriter, NoOpWriter, TracingWriter};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The level of a writer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteLevel {
    /// Very verbose diagnostics.
    Trace,
    /// Diagnostics.
    Debug,
    /// Normal progress.
    Info,
    /// Something unexpected that did not fail the unit.
    Warn,
    /// A failure.
    Error,
    /// A completed unit or run.
    Success,
}

impl fmt::Display for WriteLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// Trait for progress sinks (console, CI log, test collector).
#[cfg_attr(test, mockall::automock)]
pub trait Writer: Send + Sync {
    /// Writes a trace message.
    fn trace(&self, message: &str);

    /// Writes a debug message.
    fn debug(&self, message: &str);

    /// Writes an info message.
    fn info(&self, message: &str);

    /// Writes a warning.
    fn warn(&self, message: &str);

    /// Writes an error.
    fn error(&self, message: &str);

    /// Writes a success message.
    fn success(&self, message: &str);

    /// Opens a collapsible group.
    fn start_group(&self, name: &str);

    /// Closes the innermost group.
    fn end_group(&self);

    /// Echoes a command about to be executed.
    fn command(&self, name: &str, args: &[String]);

    /// Reports progress of a long-running step.
    fn progress(&self, name: &str, percent: u8);
}
