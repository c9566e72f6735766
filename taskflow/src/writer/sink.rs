//! Writer implementations.

use super::{WriteLevel, Writer};
use parking_lot::RwLock;
use tracing::{debug, error, info, trace, warn};

/// A writer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpWriter;

impl Writer for NoOpWriter {
    fn trace(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn start_group(&self, _name: &str) {}
    fn end_group(&self) {}
    fn command(&self, _name: &str, _args: &[String]) {}
    fn progress(&self, _name: &str, _percent: u8) {}
}

/// A writer that forwards to the `tracing` framework.
#[derive(Debug, Clone, Default)]
pub struct TracingWriter {
    target: Option<String>,
}

impl TracingWriter {
    /// Creates a tracing writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags every event with a `source` field.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.target = Some(source.into());
        self
    }

    fn source(&self) -> &str {
        self.target.as_deref().unwrap_or("taskflow")
    }
}

impl Writer for TracingWriter {
    fn trace(&self, message: &str) {
        trace!(source = self.source(), "{}", message);
    }

    fn debug(&self, message: &str) {
        debug!(source = self.source(), "{}", message);
    }

    fn info(&self, message: &str) {
        info!(source = self.source(), "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(source = self.source(), "{}", message);
    }

    fn error(&self, message: &str) {
        error!(source = self.source(), "{}", message);
    }

    fn success(&self, message: &str) {
        info!(source = self.source(), outcome = "success", "{}", message);
    }

    fn start_group(&self, name: &str) {
        info!(source = self.source(), group = %name, "begin group");
    }

    fn end_group(&self) {
        info!(source = self.source(), "end group");
    }

    fn command(&self, name: &str, args: &[String]) {
        info!(source = self.source(), command = %name, args = ?args, "exec");
    }

    fn progress(&self, name: &str, percent: u8) {
        debug!(source = self.source(), step = %name, percent, "progress");
    }
}

/// A collecting writer for tests.
///
/// Groups, commands and progress are recorded at `Debug` level with a
/// `group:`, `endgroup`, `command:` or `progress:` prefix.
#[derive(Debug, Default)]
pub struct CollectingWriter {
    entries: RwLock<Vec<(WriteLevel, String)>>,
}

impl CollectingWriter {
    /// Creates a new collecting writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected entries.
    #[must_use]
    pub fn entries(&self) -> Vec<(WriteLevel, String)> {
        self.entries.read().clone()
    }

    /// Returns messages written at `level`.
    #[must_use]
    pub fn messages_at(&self, level: WriteLevel) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Returns true if any entry contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.read().iter().any(|(_, m)| m.contains(needle))
    }

    /// Returns the number of collected entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clears all collected entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn push(&self, level: WriteLevel, message: String) {
        self.entries.write().push((level, message));
    }
}

impl Writer for CollectingWriter {
    fn trace(&self, message: &str) {
        self.push(WriteLevel::Trace, message.to_string());
    }

    fn debug(&self, message: &str) {
        self.push(WriteLevel::Debug, message.to_string());
    }

    fn info(&self, message: &str) {
        self.push(WriteLevel::Info, message.to_string());
    }

    fn warn(&self, message: &str) {
        self.push(WriteLevel::Warn, message.to_string());
    }

    fn error(&self, message: &str) {
        self.push(WriteLevel::Error, message.to_string());
    }

    fn success(&self, message: &str) {
        self.push(WriteLevel::Success, message.to_string());
    }

    fn start_group(&self, name: &str) {
        self.push(WriteLevel::Debug, format!("group:{name}"));
    }

    fn end_group(&self) {
        self.push(WriteLevel::Debug, "endgroup".to_string());
    }

    fn command(&self, name: &str, args: &[String]) {
        self.push(WriteLevel::Debug, format!("command:{} {}", name, args.join(" ")));
    }

    fn progress(&self, name: &str, percent: u8) {
        self.push(WriteLevel::Debug, format!("progress:{name} {percent}%"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_and_tracing_writers_do_not_panic() {
        let noop = NoOpWriter;
        noop.info("ignored");
        noop.command("echo", &["hi".to_string()]);

        let tracing_writer = TracingWriter::new().with_source("test");
        tracing_writer.success("done");
        tracing_writer.progress("upload", 50);
    }

    #[test]
    fn test_collecting_writer_levels() {
        let writer = CollectingWriter::new();
        assert!(writer.is_empty());

        writer.info("starting");
        writer.error("broke");
        writer.start_group("build");
        writer.end_group();

        assert_eq!(writer.len(), 4);
        assert_eq!(writer.messages_at(WriteLevel::Error), vec!["broke"]);
        assert!(writer.contains("group:build"));

        writer.clear();
        assert!(writer.is_empty());
    }
}
