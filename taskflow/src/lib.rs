//! # Taskflow
//!
//! A dependency-ordered execution engine for tasks, jobs and deployments.
//!
//! Taskflow takes declaratively named units of work and runs them with:
//!
//! - **Graph resolution**: depth-first ordering with cycle and unknown-dependency detection
//! - **Partial-failure semantics**: failed units block dependents unless `force` is set
//! - **Shared context**: environment, secrets and accumulated outputs flow between units
//! - **Pluggable handlers**: named execution backends with input validation
//! - **Deployment lifecycles**: `before -> run -> after` and the matching teardown
//! - **Secret masking**: every string reaching the writer is redacted first
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use taskflow::prelude::*;
//!
//! let mut map = UnitMap::new();
//! map.declare(Unit::builder("build").uses("shell").with_input("script", "make"))?
//!     .declare(Unit::builder("test").need("build").uses("shell"))?;
//!
//! let executor = Executor::new(registry);
//! let ctx = std::sync::Arc::new(RunContext::new().with_process_env());
//! let report = executor.run_targets(&map, ["test"], &ctx).await?;
//! assert!(report.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod deployment;
pub mod errors;
pub mod executor;
pub mod graph;
pub mod handlers;
pub mod observability;
pub mod secrets;
pub mod testing;
pub mod units;
pub mod utils;
pub mod writer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::ExecutorConfig;
    pub use crate::context::{RunContext, UnitContext};
    pub use crate::core::{ActionResult, Outputs, RunRecord, RunReport, StringMap, UnitStatus};
    pub use crate::deployment::{Deployment, DeploymentLifecycle, DeploymentMap, HookScope};
    pub use crate::errors::{
        CycleDetectedError, TaskflowError, UnitError, UnitValidationError,
        UnknownDependencyError,
    };
    pub use crate::executor::Executor;
    pub use crate::graph::GraphResolver;
    pub use crate::handlers::{
        Handler, HandlerDescriptor, HandlerRegistry, InputSchema, InputSpec, OutputSchema,
        ValueKind,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::secrets::SecretMasker;
    pub use crate::units::{JobMap, TaskMap, Unit, UnitBuilder, UnitMap};
    pub use crate::writer::{TracingWriter, Writer};
}
