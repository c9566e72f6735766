//! Deployments: units with a teardown action and lifecycle hooks.
//!
//! A [`Deployment`] wraps a main action and an optional destroy action. Its
//! four hooks each build a private sub-graph through a [`HookScope`], which
//! can splice in units from a shared map. [`DeploymentLifecycle`] runs the
//! three stages of `up` or `down` against one context.

mod lifecycle;
mod spec;

pub use lifecycle::DeploymentLifecycle;
pub use spec::{Deployment, DeploymentBuilder, DeploymentMap, HookBuilder, HookScope};
