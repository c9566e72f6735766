//! Test fixtures for executor and lifecycle tests.

use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::context::RunContext;
use crate::core::RunReport;
use crate::deployment::DeploymentLifecycle;
use crate::errors::TaskflowError;
use crate::executor::Executor;
use crate::handlers::{Handler, HandlerDescriptor, HandlerRegistry};
use crate::units::UnitMap;
use crate::writer::CollectingWriter;

/// A registry, a collecting writer and a run context wired together.
#[derive(Debug)]
pub struct TestRun {
    /// The handler registry the executor dispatches through.
    pub registry: Arc<HandlerRegistry>,
    /// Everything written during the run, already masked.
    pub writer: Arc<CollectingWriter>,
    /// The run context.
    pub ctx: Arc<RunContext>,
    config: ExecutorConfig,
}

impl Default for TestRun {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRun {
    /// Creates a fixture with an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::with_context(RunContext::new())
    }

    /// Creates a fixture around a prepared context.
    ///
    /// The context's writer is replaced with the fixture's collector.
    #[must_use]
    pub fn with_context(ctx: RunContext) -> Self {
        let writer = Arc::new(CollectingWriter::new());
        Self {
            registry: Arc::new(HandlerRegistry::new()),
            ctx: Arc::new(ctx.with_writer(writer.clone())),
            writer,
            config: ExecutorConfig::default(),
        }
    }

    /// Sets the executor configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a handler under `name`.
    #[must_use]
    pub fn with_handler(self, name: &str, handler: impl Handler + 'static) -> Self {
        self.registry.register(HandlerDescriptor::new(name, handler));
        self
    }

    /// Registers a full descriptor.
    #[must_use]
    pub fn with_descriptor(self, descriptor: HandlerDescriptor) -> Self {
        self.registry.register(descriptor);
        self
    }

    /// Returns an executor over the fixture's registry.
    #[must_use]
    pub fn executor(&self) -> Executor {
        Executor::new(self.registry.clone()).with_config(self.config.clone())
    }

    /// Returns a lifecycle over the fixture's registry.
    #[must_use]
    pub fn lifecycle(&self, shared: UnitMap) -> DeploymentLifecycle {
        DeploymentLifecycle::new(self.executor(), shared)
    }

    /// Creates a fresh context that shares the fixture's writer.
    #[must_use]
    pub fn fresh_context(&self) -> Arc<RunContext> {
        Arc::new(RunContext::new().with_writer(self.writer.clone()))
    }

    /// Resolves `targets` and runs them in the fixture's context.
    pub async fn run<S: AsRef<str>>(
        &self,
        map: &UnitMap,
        targets: impl IntoIterator<Item = S>,
    ) -> Result<RunReport, TaskflowError> {
        self.executor().run_targets(map, targets, &self.ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHandler;
    use crate::units::Unit;

    #[tokio::test]
    async fn test_fixture_runs_targets() {
        let mock = Arc::new(MockHandler::new());
        let fixture = TestRun::new().with_handler("noop", mock.clone());

        let map: UnitMap = [Unit::builder("a").uses("noop").build().unwrap()]
            .into_iter()
            .collect();
        let report = fixture.run(&map, ["a"]).await.unwrap();

        assert!(report.is_success());
        assert_eq!(mock.call_count(), 1);
        assert!(fixture.writer.contains("a succeeded"));
    }
}
