//! The view of a run handed to a single unit's action.

use super::RunContext;
use crate::cancellation::CancellationToken;
use crate::core::{Outputs, StringMap};
use crate::writer::MaskedWriter;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Context passed to a unit's action.
///
/// The environment is a unit-scoped copy: the run environment with the unit's
/// overrides merged on top. Changes never leak back into the run.
#[derive(Clone)]
pub struct UnitContext {
    run: Arc<RunContext>,
    unit_id: String,
    name: String,
    env: StringMap,
    cwd: Option<String>,
    inputs: Map<String, Value>,
    cancel: Arc<CancellationToken>,
}

impl UnitContext {
    /// Creates a context for `unit_id` inheriting the run environment.
    #[must_use]
    pub fn new(run: Arc<RunContext>, unit_id: impl Into<String>, name: impl Into<String>) -> Self {
        let env = run.env();
        let cancel = run.cancellation().child();
        Self {
            run,
            unit_id: unit_id.into(),
            name: name.into(),
            env,
            cwd: None,
            inputs: Map::new(),
            cancel,
        }
    }

    /// Merges environment overrides over the inherited environment.
    #[must_use]
    pub fn with_env_overrides(mut self, overrides: &StringMap) -> Self {
        self.env.merge(overrides);
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: Option<String>) -> Self {
        self.cwd = cwd;
        self
    }

    /// Sets the validated handler inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Returns the unit id.
    #[must_use]
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning run context.
    #[must_use]
    pub fn run(&self) -> &Arc<RunContext> {
        &self.run
    }

    /// Returns the unit-scoped environment.
    #[must_use]
    pub fn env(&self) -> &StringMap {
        &self.env
    }

    /// Gets an environment variable from the unit-scoped environment.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.env.get(key)
    }

    /// Returns the working directory, if one was set.
    #[must_use]
    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    /// Returns the handler inputs.
    #[must_use]
    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    /// Gets a single handler input.
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.inputs.get(key)
    }

    /// Gets a handler input as a string.
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(Value::as_str)
    }

    /// Gets a secret value.
    #[must_use]
    pub fn secret(&self, key: &str) -> Option<String> {
        self.run.secret(key)
    }

    /// Gets an output recorded by an earlier unit.
    ///
    /// Returns `None` when the unit was skipped, has not run, or did not
    /// produce `key`.
    #[must_use]
    pub fn output(&self, unit: &str, key: &str) -> Option<Value> {
        self.run.outputs().value(unit, key)
    }

    /// Gets every output recorded by an earlier unit.
    #[must_use]
    pub fn outputs_of(&self, unit: &str) -> Option<Outputs> {
        self.run.outputs().get(unit)
    }

    /// Returns the raw invocation arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.run.args()
    }

    /// Returns the masking writer.
    #[must_use]
    pub fn writer(&self) -> MaskedWriter {
        self.run.writer()
    }

    /// Masks secrets in `text`.
    #[must_use]
    pub fn mask(&self, text: &str) -> String {
        self.run.mask(text)
    }

    /// Returns this unit's cancellation token.
    ///
    /// It is cancelled when the run is cancelled or when the unit times out.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Returns whether the action should stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits until the action should stop.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

impl std::fmt::Debug for UnitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitContext")
            .field("run_id", &self.run.run_id())
            .field("unit_id", &self.unit_id)
            .field("name", &self.name)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run() -> Arc<RunContext> {
        Arc::new(
            RunContext::new()
                .with_env("STAGE", "dev")
                .with_env("REGION", "eu")
                .with_secret("TOKEN", "s3cr3t"),
        )
    }

    #[test]
    fn test_env_overrides_are_unit_scoped() {
        let run = run();
        let overrides: StringMap = [("STAGE", "prod")].into_iter().collect();

        let ctx = UnitContext::new(run.clone(), "deploy", "Deploy").with_env_overrides(&overrides);
        let sibling = UnitContext::new(run.clone(), "notify", "Notify");

        assert_eq!(ctx.var("STAGE"), Some("prod"));
        assert_eq!(ctx.var("REGION"), Some("eu"));
        assert_eq!(sibling.var("STAGE"), Some("dev"));
        assert_eq!(run.env_var("STAGE").as_deref(), Some("dev"));
    }

    #[test]
    fn test_reads_outputs_and_secrets() {
        let run = run();
        run.outputs()
            .insert("build", Outputs::new().with("image", "app:1"))
            .unwrap();

        let ctx = UnitContext::new(run, "test", "Test");
        assert_eq!(ctx.output("build", "image"), Some(json!("app:1")));
        assert_eq!(ctx.output("lint", "anything"), None);
        assert!(ctx.outputs_of("build").is_some());
        assert_eq!(ctx.secret("TOKEN").as_deref(), Some("s3cr3t"));
        assert_eq!(ctx.mask("token=s3cr3t"), "token=*******");
    }

    #[test]
    fn test_inputs() {
        let mut inputs = Map::new();
        inputs.insert("path".to_string(), json!("dist/"));
        let ctx = UnitContext::new(run(), "upload", "Upload").with_inputs(inputs);

        assert_eq!(ctx.input_str("path"), Some("dist/"));
        assert_eq!(ctx.input("missing"), None);
    }

    #[test]
    fn test_unit_cancellation_follows_run() {
        let run = run();
        let ctx = UnitContext::new(run.clone(), "a", "A");
        let other = UnitContext::new(run.clone(), "b", "B");

        ctx.cancellation().cancel("timeout");
        assert!(ctx.is_cancelled());
        assert!(!run.is_cancelled());
        assert!(!other.is_cancelled());

        run.cancel("stop");
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let run = run();
        let ctx = UnitContext::new(run.clone(), "a", "A");

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.cancelled().await })
        };
        tokio::task::yield_now().await;
        run.cancel("stop");

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
