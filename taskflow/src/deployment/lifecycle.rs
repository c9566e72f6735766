//! Deploy and teardown runs around a [`Deployment`].

use super::spec::{Deployment, HookBuilder, HookScope};
use crate::context::RunContext;
use crate::core::{RunRecord, RunReport, UnitStatus};
use crate::errors::TaskflowError;
use crate::executor::Executor;
use crate::graph::GraphResolver;
use crate::units::{Unit, UnitMap};
use crate::writer::Writer;
use std::sync::Arc;
use tracing::{debug, info};

/// A resolved hook stage ready to run.
struct Stage {
    map: UnitMap,
    order: Vec<String>,
}

impl Stage {
    fn empty() -> Self {
        Self {
            map: UnitMap::new(),
            order: Vec::new(),
        }
    }

    fn single(unit: &Arc<Unit>) -> Self {
        let mut map = UnitMap::new();
        map.insert_shared(unit.clone());
        Self {
            map,
            order: vec![unit.id().to_string()],
        }
    }

    /// Drops units that already succeeded in an earlier stage of this run.
    /// Their outputs are in the context, and dependents find no record to
    /// block on.
    fn without_succeeded(mut self, done: &RunReport) -> Self {
        self.order.retain(|id| {
            let succeeded = done.status_of(id) == Some(UnitStatus::Succeeded);
            if succeeded {
                debug!(unit = %id, "Reusing unit from an earlier stage");
            }
            !succeeded
        });
        self
    }
}

/// Which half of the lifecycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Runs deployments through `before -> run -> after` and
/// `before_destroy -> destroy -> after_destroy`.
///
/// Each stage is a separate executor run over the same context. A failed or
/// blocked unit in an earlier stage blocks every non-forced unit of the
/// stages after it.
#[derive(Debug, Clone)]
pub struct DeploymentLifecycle {
    executor: Executor,
    shared: UnitMap,
}

impl DeploymentLifecycle {
    /// Creates a lifecycle whose hooks may splice units from `shared`.
    #[must_use]
    pub fn new(executor: Executor, shared: UnitMap) -> Self {
        Self { executor, shared }
    }

    /// Returns the executor.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Returns the map hooks borrow units from.
    #[must_use]
    pub fn shared(&self) -> &UnitMap {
        &self.shared
    }

    /// Deploys: `before` hooks, the main action, then `after` hooks.
    ///
    /// # Errors
    ///
    /// Returns a build-time error from a hook builder or from resolving a
    /// hook graph. Nothing has run when an error is returned.
    pub async fn up(
        &self,
        deployment: &Deployment,
        ctx: &Arc<RunContext>,
    ) -> Result<RunReport, TaskflowError> {
        let before = self.build_stage(deployment.before())?;
        let after = self.build_stage(deployment.after())?;
        let main = Some(Stage::single(deployment.main()));
        Ok(self
            .run_stages(deployment, Direction::Up, before, main, after, ctx)
            .await)
    }

    /// Tears down: `before_destroy` hooks, the destroy action, then
    /// `after_destroy` hooks.
    ///
    /// A deployment without a destroy action gets a skipped record in its
    /// place; the hooks still run.
    ///
    /// # Errors
    ///
    /// Same as [`DeploymentLifecycle::up`].
    pub async fn down(
        &self,
        deployment: &Deployment,
        ctx: &Arc<RunContext>,
    ) -> Result<RunReport, TaskflowError> {
        let before = self.build_stage(deployment.before_destroy())?;
        let after = self.build_stage(deployment.after_destroy())?;
        let main = deployment.destroy().map(Stage::single);
        Ok(self
            .run_stages(deployment, Direction::Down, before, main, after, ctx)
            .await)
    }

    fn build_stage(&self, hook: Option<&HookBuilder>) -> Result<Stage, TaskflowError> {
        let Some(hook) = hook else {
            return Ok(Stage::empty());
        };

        let mut scope = HookScope::new(&self.shared);
        hook(&mut scope)?;
        let map = scope.into_map();
        let order = GraphResolver::resolve_all(&map)?;
        Ok(Stage { map, order })
    }

    async fn run_stages(
        &self,
        deployment: &Deployment,
        direction: Direction,
        before: Stage,
        main: Option<Stage>,
        after: Stage,
        ctx: &Arc<RunContext>,
    ) -> RunReport {
        info!(
            deployment = %deployment.id(),
            direction = direction.as_str(),
            run_id = %ctx.run_id(),
            "Starting deployment lifecycle"
        );

        let mut report = self
            .executor
            .run_stage(&before.map, &before.order, ctx, None)
            .await;
        let before_failure = first_blocking(&report).map(ToString::to_string);

        let main_report = match main.map(|stage| stage.without_succeeded(&report)) {
            Some(stage) => {
                self.executor
                    .run_stage(&stage.map, &stage.order, ctx, before_failure.as_deref())
                    .await
            }
            None => {
                let mut record = RunRecord::pending(deployment.id(), deployment.name());
                ctx.writer().info(&format!(
                    "Skipping {}: no destroy action declared",
                    deployment.name()
                ));
                record.skip("no destroy action declared");
                let mut skipped = RunReport::new(ctx.run_id());
                skipped.records.push(record);
                skipped
            }
        };
        let after_failure = first_blocking(&main_report)
            .map(ToString::to_string)
            .or(before_failure);
        report.extend(main_report);

        let after = after.without_succeeded(&report);
        let after_report = self
            .executor
            .run_stage(&after.map, &after.order, ctx, after_failure.as_deref())
            .await;
        report.extend(after_report);
        report.cancelled = ctx.is_cancelled();

        info!(
            deployment = %deployment.id(),
            direction = direction.as_str(),
            success = report.is_success(),
            "Deployment lifecycle finished"
        );
        report
    }
}

/// The first unit whose record blocks later stages.
fn first_blocking(report: &RunReport) -> Option<&str> {
    report
        .records
        .iter()
        .find(|r| r.status.blocks_dependents())
        .map(|r| r.unit_id.as_str())
}
