//! Deployment declarations.

use crate::context::UnitContext;
use crate::core::ActionResult;
use crate::errors::{TaskflowError, UnitValidationError};
use crate::units::{Unit, UnitBuilder, UnitMap};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Populates a private sub-graph for one lifecycle stage.
pub type HookBuilder = Arc<dyn Fn(&mut HookScope<'_>) -> Result<(), TaskflowError> + Send + Sync>;

/// What a hook builder sees: a private map to fill and the shared map to
/// borrow units from.
#[derive(Debug)]
pub struct HookScope<'a> {
    local: UnitMap,
    shared: &'a UnitMap,
}

impl<'a> HookScope<'a> {
    /// Creates an empty scope over `shared`.
    #[must_use]
    pub fn new(shared: &'a UnitMap) -> Self {
        Self {
            local: UnitMap::new(),
            shared,
        }
    }

    /// Declares a unit in the private map.
    ///
    /// # Errors
    ///
    /// Returns the unit's validation error.
    pub fn declare(&mut self, builder: UnitBuilder) -> Result<&mut Self, TaskflowError> {
        self.local.declare(builder)?;
        Ok(self)
    }

    /// Splices a unit from the shared map into the private map.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDependency` if the shared map has no such unit.
    pub fn add(&mut self, id: &str) -> Result<&mut Self, TaskflowError> {
        self.local.add_from(self.shared, id)?;
        Ok(self)
    }

    /// Removes a unit from the private map.
    pub fn remove(&mut self, id: &str) -> &mut Self {
        self.local.remove(id);
        self
    }

    /// Returns the private map built so far.
    #[must_use]
    pub fn map(&self) -> &UnitMap {
        &self.local
    }

    /// Returns the shared map.
    #[must_use]
    pub fn shared(&self) -> &UnitMap {
        self.shared
    }

    /// Consumes the scope, returning the private map.
    #[must_use]
    pub fn into_map(self) -> UnitMap {
        self.local
    }
}

/// A unit with a teardown action and four lifecycle hooks.
#[derive(Clone)]
pub struct Deployment {
    main: Arc<Unit>,
    destroy: Option<Arc<Unit>>,
    before: Option<HookBuilder>,
    after: Option<HookBuilder>,
    before_destroy: Option<HookBuilder>,
    after_destroy: Option<HookBuilder>,
}

impl Deployment {
    /// Starts declaring a deployment.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> DeploymentBuilder {
        DeploymentBuilder::new(id)
    }

    /// Returns the deployment id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.main.id()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.main.name()
    }

    /// Returns the unit run by `up`.
    #[must_use]
    pub fn main(&self) -> &Arc<Unit> {
        &self.main
    }

    /// Returns the unit run by `down`, if a destroy action was declared.
    #[must_use]
    pub fn destroy(&self) -> Option<&Arc<Unit>> {
        self.destroy.as_ref()
    }

    /// Returns the `before` hook.
    #[must_use]
    pub fn before(&self) -> Option<&HookBuilder> {
        self.before.as_ref()
    }

    /// Returns the `after` hook.
    #[must_use]
    pub fn after(&self) -> Option<&HookBuilder> {
        self.after.as_ref()
    }

    /// Returns the `before_destroy` hook.
    #[must_use]
    pub fn before_destroy(&self) -> Option<&HookBuilder> {
        self.before_destroy.as_ref()
    }

    /// Returns the `after_destroy` hook.
    #[must_use]
    pub fn after_destroy(&self) -> Option<&HookBuilder> {
        self.after_destroy.as_ref()
    }
}

impl fmt::Debug for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployment")
            .field("main", &self.main)
            .field("destroy", &self.destroy)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("before_destroy", &self.before_destroy.is_some())
            .field("after_destroy", &self.after_destroy.is_some())
            .finish()
    }
}

/// Builder for [`Deployment`].
///
/// Timeout, environment, working directory and `when` apply to both the
/// main and the destroy action.
pub struct DeploymentBuilder {
    main: UnitBuilder,
    destroy: Option<UnitBuilder>,
    before: Option<HookBuilder>,
    after: Option<HookBuilder>,
    before_destroy: Option<HookBuilder>,
    after_destroy: Option<HookBuilder>,
}

impl DeploymentBuilder {
    /// Creates a builder for `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            main: UnitBuilder::new(id),
            destroy: None,
            before: None,
            after: None,
            before_destroy: None,
            after_destroy: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.main = self.main.name(name);
        self
    }

    /// Sets an inline deploy action.
    #[must_use]
    pub fn run<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.main = self.main.run(func);
        self
    }

    /// References a handler for the deploy action.
    #[must_use]
    pub fn uses(mut self, handler: impl Into<String>) -> Self {
        self.main = self.main.uses(handler);
        self
    }

    /// Adds a deploy handler input.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.main = self.main.with_input(key, value);
        self
    }

    /// Sets an inline destroy action.
    #[must_use]
    pub fn destroy<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.destroy = Some(self.destroy_builder().run(func));
        self
    }

    /// References a handler for the destroy action.
    #[must_use]
    pub fn destroy_uses(mut self, handler: impl Into<String>) -> Self {
        self.destroy = Some(self.destroy_builder().uses(handler));
        self
    }

    /// Adds a destroy handler input.
    #[must_use]
    pub fn destroy_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.destroy = Some(self.destroy_builder().with_input(key, value));
        self
    }

    /// Runs the deploy action even if a `before` unit failed.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.main = self.main.force(force);
        self
    }

    /// Sets the action timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.main = self.main.timeout(timeout);
        self
    }

    /// Adds an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.main = self.main.env(key, value);
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.main = self.main.cwd(cwd);
        self
    }

    /// Sets the `when` predicate.
    #[must_use]
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&UnitContext) -> bool + Send + Sync + 'static,
    {
        self.main = self.main.when(predicate);
        self
    }

    /// Sets the hook run before the deploy action.
    #[must_use]
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> Result<(), TaskflowError> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run after the deploy action.
    #[must_use]
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> Result<(), TaskflowError> + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run before the destroy action.
    #[must_use]
    pub fn before_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> Result<(), TaskflowError> + Send + Sync + 'static,
    {
        self.before_destroy = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run after the destroy action.
    #[must_use]
    pub fn after_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> Result<(), TaskflowError> + Send + Sync + 'static,
    {
        self.after_destroy = Some(Arc::new(hook));
        self
    }

    fn destroy_builder(&mut self) -> UnitBuilder {
        self.destroy
            .take()
            .unwrap_or_else(|| UnitBuilder::new(self.main.id()))
    }

    /// Builds the deployment.
    ///
    /// # Errors
    ///
    /// Returns `UnitValidationError` if the deploy or destroy action is
    /// invalid.
    pub fn build(self) -> Result<Deployment, UnitValidationError> {
        let main = self.main.build()?;

        let destroy = match self.destroy {
            Some(builder) => {
                let mut builder = builder.name(main.name());
                if let Some(timeout) = main.timeout() {
                    builder = builder.timeout(timeout);
                }
                for (key, value) in main.env().iter() {
                    builder = builder.env(key, value);
                }
                if let Some(cwd) = main.cwd() {
                    builder = builder.cwd(cwd);
                }
                if let Some(predicate) = main.condition() {
                    let predicate = predicate.clone();
                    builder = builder.when(move |ctx| predicate(ctx));
                }
                Some(Arc::new(builder.build()?))
            }
            None => None,
        };

        Ok(Deployment {
            main: Arc::new(main),
            destroy,
            before: self.before,
            after: self.after,
            before_destroy: self.before_destroy,
            after_destroy: self.after_destroy,
        })
    }
}

impl fmt::Debug for DeploymentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentBuilder")
            .field("main", &self.main)
            .field("destroy", &self.destroy)
            .finish_non_exhaustive()
    }
}

/// A named registry of deployments, iterated in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DeploymentMap {
    deployments: HashMap<String, Arc<Deployment>>,
    order: Vec<String>,
}

impl DeploymentMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a deployment, returning the one it replaced.
    pub fn insert(&mut self, deployment: Deployment) -> Option<Arc<Deployment>> {
        let id = deployment.id().to_string();
        let previous = self.deployments.insert(id.clone(), Arc::new(deployment));
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    /// Builds and registers a deployment.
    ///
    /// # Errors
    ///
    /// Returns the builder's validation error.
    pub fn declare(&mut self, builder: DeploymentBuilder) -> Result<&mut Self, UnitValidationError> {
        self.insert(builder.build()?);
        Ok(self)
    }

    /// Removes a deployment.
    pub fn remove(&mut self, id: &str) -> Option<Arc<Deployment>> {
        let removed = self.deployments.remove(id);
        if removed.is_some() {
            self.order.retain(|o| o != id);
        }
        removed
    }

    /// Gets a deployment.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Deployment>> {
        self.deployments.get(id)
    }

    /// Checks if a deployment is declared.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.deployments.contains_key(id)
    }

    /// Returns deployment ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Iterates deployments in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Deployment>)> {
        self.order
            .iter()
            .filter_map(|id| self.deployments.get(id).map(|d| (id.as_str(), d)))
    }

    /// Returns the number of deployments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
