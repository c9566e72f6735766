//! The best-effort sequential executor.
//!
//! Walks a resolved order and drives each unit through its state machine:
//! cancellation check, dependency blocking, `when` evaluation, dispatch with
//! timeout, then output recording. A failing unit never aborts the run;
//! independent branches keep going and every unit in the order gets a
//! [`RunRecord`].

mod action;

use crate::config::ExecutorConfig;
use crate::context::{RunContext, UnitContext};
use crate::core::{ActionResult, Outputs, RunRecord, RunReport};
use crate::errors::{TaskflowError, UnitError};
use crate::graph::GraphResolver;
use crate::handlers::{HandlerRegistry, OutputSchema};
use crate::units::{Unit, UnitAction, UnitMap};
use crate::utils::elapsed_ms;
use crate::writer::{MaskedWriter, Writer};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Executes units in a resolved order.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<HandlerRegistry>,
    config: ExecutorConfig,
}

impl Executor {
    /// Creates an executor dispatching through `registry`.
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            config: ExecutorConfig::default(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the handler registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs `order` against `map`.
    ///
    /// Records are returned in execution order and include blocked and
    /// skipped units. An id in `order` that `map` does not declare gets a
    /// failed record.
    pub async fn run(&self, map: &UnitMap, order: &[String], ctx: &Arc<RunContext>) -> RunReport {
        self.run_stage(map, order, ctx, None).await
    }

    /// Resolves `targets` and runs the resulting order.
    ///
    /// # Errors
    ///
    /// Returns build-time errors (unknown dependency, cycle) before any unit
    /// executes or the writer is touched.
    pub async fn run_targets<S: AsRef<str>>(
        &self,
        map: &UnitMap,
        targets: impl IntoIterator<Item = S>,
        ctx: &Arc<RunContext>,
    ) -> Result<RunReport, TaskflowError> {
        let order = GraphResolver::resolve(map, targets)?;
        Ok(self.run(map, &order, ctx).await)
    }

    /// Runs one stage of a larger run.
    ///
    /// When `upstream_failure` names a failed unit of an earlier stage, every
    /// non-forced unit of this stage is blocked by it.
    pub(crate) async fn run_stage(
        &self,
        map: &UnitMap,
        order: &[String],
        ctx: &Arc<RunContext>,
        upstream_failure: Option<&str>,
    ) -> RunReport {
        let start = Instant::now();
        let writer = ctx.writer();
        let mut report = RunReport::new(ctx.run_id());

        debug!(run_id = %ctx.run_id(), units = order.len(), "Starting run");

        for id in order {
            let record = match map.get(id) {
                Some(unit) => {
                    self.run_unit(unit, &report, ctx, upstream_failure, &writer)
                        .await
                }
                None => {
                    let error = UnitError::NotDeclared { unit: id.clone() };
                    writer.error(&format!("{id} failed: {error}"));
                    let mut record = RunRecord::pending(id, id);
                    record.fail(error);
                    record
                }
            };
            report.records.push(record);
        }

        report.cancelled = ctx.is_cancelled();
        report.duration_ms = elapsed_ms(start);

        let summary = report.summary();
        info!(
            run_id = %ctx.run_id(),
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            blocked = summary.blocked,
            duration_ms = report.duration_ms,
            "Run finished"
        );

        report
    }

    async fn run_unit(
        &self,
        unit: &Arc<Unit>,
        report: &RunReport,
        ctx: &Arc<RunContext>,
        upstream_failure: Option<&str>,
        writer: &MaskedWriter,
    ) -> RunRecord {
        let mut record = RunRecord::pending(unit.id(), unit.name());

        if ctx.is_cancelled() {
            let reason = ctx.cancellation().reason().unwrap_or_default();
            let error = UnitError::Cancelled { reason };
            writer.debug(&format!("{} not started: {error}", unit.name()));
            record.block(error);
            return record;
        }

        if !unit.force() {
            if let Some(dependency) = blocking_dependency(unit, report).or(upstream_failure) {
                let error = UnitError::BlockedByDependency {
                    dependency: dependency.to_string(),
                };
                debug!(unit = %unit.id(), %dependency, "Unit blocked");
                writer.debug(&format!("{} blocked: {error}", unit.name()));
                record.block(error);
                return record;
            }
        }

        let unit_ctx = UnitContext::new(ctx.clone(), unit.id(), unit.name())
            .with_env_overrides(unit.env())
            .with_cwd(unit.cwd().map(ToString::to_string));

        if let Some(predicate) = unit.condition() {
            match catch_unwind(AssertUnwindSafe(|| predicate(&unit_ctx))) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(unit = %unit.id(), "Condition false; skipping");
                    writer.info(&format!("Skipping {}: condition not met", unit.name()));
                    record.skip("condition evaluated to false");
                    return record;
                }
                Err(payload) => {
                    let error = UnitError::ActionPanic {
                        message: action::panic_message(payload.as_ref()),
                    };
                    writer.error(&format!("{} failed: {error}", unit.name()));
                    record.fail(error);
                    return record;
                }
            }
        }

        writer.start_group(unit.name());
        record.start();

        match self.dispatch(unit, unit_ctx, writer).await {
            Ok(outputs) => match ctx.outputs().insert(unit.id(), outputs.clone()) {
                Ok(()) => {
                    record.succeed(outputs);
                    writer.success(&format!(
                        "{} succeeded in {:.0}ms",
                        unit.name(),
                        record.duration_ms()
                    ));
                }
                Err(conflict) => {
                    let error = UnitError::from(conflict);
                    writer.error(&format!("{} failed: {error}", unit.name()));
                    record.fail(error);
                }
            },
            Err(error) => {
                writer.error(&format!("{} failed: {error}", unit.name()));
                record.fail(error);
            }
        }

        writer.end_group();
        info!(
            unit = %unit.id(),
            status = %record.status,
            duration_ms = record.duration_ms(),
            "Unit finished"
        );
        record
    }

    async fn dispatch(&self, unit: &Unit, ctx: UnitContext, writer: &MaskedWriter) -> ActionResult {
        let (action, schema): (BoxFuture<'static, ActionResult>, Option<(String, OutputSchema)>) =
            match unit.action() {
                UnitAction::Delegate(delegate) => {
                    let delegate = delegate.clone();
                    let delegate_ctx = ctx.clone();
                    // Called on the spawned task so a panic while building
                    // the future is contained like one inside it.
                    (async move { delegate(delegate_ctx).await }.boxed(), None)
                }
                UnitAction::Handler(reference) => {
                    let descriptor = self.registry.resolve(&reference.uses)?;
                    let inputs = descriptor.validate_inputs(&reference.with)?;
                    let handler = descriptor.handler().clone();
                    let handler_ctx = ctx.clone().with_inputs(inputs);
                    (
                        async move { handler.run(handler_ctx).await }.boxed(),
                        Some((descriptor.name.clone(), descriptor.outputs.clone())),
                    )
                }
            };

        let span = info_span!("unit", unit = %unit.id(), run_id = %ctx.run().run_id());
        let limit = unit.timeout().or_else(|| self.config.default_timeout());
        let outputs = action::invoke(action, &ctx, limit, self.config.cancel_grace(), span).await?;

        match schema {
            Some((handler, schema)) => self.check_outputs(&handler, &schema, outputs, writer),
            None => Ok(outputs),
        }
    }

    fn check_outputs(
        &self,
        handler: &str,
        schema: &OutputSchema,
        outputs: Outputs,
        writer: &MaskedWriter,
    ) -> ActionResult {
        let undeclared = schema.undeclared(&outputs);
        if undeclared.is_empty() {
            return Ok(outputs);
        }

        let message = format!(
            "Handler '{handler}' returned undeclared outputs: {}",
            undeclared.join(", ")
        );
        if self.config.strict_outputs {
            return Err(UnitError::failed(message));
        }

        warn!(%handler, ?undeclared, "Undeclared handler outputs");
        writer.warn(&message);
        Ok(outputs)
    }
}

/// Returns the first dependency whose record blocks `unit`.
fn blocking_dependency<'a>(unit: &'a Unit, report: &RunReport) -> Option<&'a str> {
    unit.needs()
        .iter()
        .find(|need| {
            report
                .status_of(need)
                .is_some_and(|status| status.blocks_dependents())
        })
        .map(String::as_str)
}
