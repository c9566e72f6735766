//! Unit declarations.

use crate::context::UnitContext;
use crate::core::{ActionResult, StringMap};
use crate::errors::UnitValidationError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// An inline action.
pub type Delegate = Arc<dyn Fn(UnitContext) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// A `when` predicate.
pub type Predicate = Arc<dyn Fn(&UnitContext) -> bool + Send + Sync>;

/// A reference to a registered handler plus its input payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerRef {
    /// The handler name.
    pub uses: String,
    /// The input payload, validated at dispatch.
    #[serde(default)]
    pub with: Map<String, Value>,
}

impl HandlerRef {
    /// Creates a reference with an empty payload.
    #[must_use]
    pub fn new(uses: impl Into<String>) -> Self {
        Self {
            uses: uses.into(),
            with: Map::new(),
        }
    }

    /// Adds an input.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }
}

/// The single action source of a unit.
#[derive(Clone)]
pub enum UnitAction {
    /// An inline async closure.
    Delegate(Delegate),
    /// A registered handler, resolved when the unit runs.
    Handler(HandlerRef),
}

impl UnitAction {
    /// Wraps an async closure.
    pub fn delegate<F, Fut>(func: F) -> Self
    where
        F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self::Delegate(Arc::new(move |ctx| func(ctx).boxed()))
    }

    /// Returns the handler name for handler actions.
    #[must_use]
    pub fn uses(&self) -> Option<&str> {
        match self {
            Self::Delegate(_) => None,
            Self::Handler(r) => Some(&r.uses),
        }
    }
}

impl fmt::Debug for UnitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegate(_) => f.write_str("Delegate(..)"),
            Self::Handler(r) => f.debug_tuple("Handler").field(r).finish(),
        }
    }
}

/// A declared unit of work: a task, a job step or a deployment stage.
///
/// Immutable once built. Construct with [`Unit::builder`].
#[derive(Clone)]
pub struct Unit {
    id: String,
    name: String,
    needs: Vec<String>,
    action: UnitAction,
    when: Option<Predicate>,
    force: bool,
    timeout: Option<Duration>,
    env: StringMap,
    cwd: Option<String>,
}

impl Unit {
    /// Starts declaring a unit.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(id)
    }

    /// Returns the unit id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared dependencies in declaration order.
    #[must_use]
    pub fn needs(&self) -> &[String] {
        &self.needs
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> &UnitAction {
        &self.action
    }

    /// Returns whether the unit runs despite failed dependencies.
    #[must_use]
    pub fn force(&self) -> bool {
        self.force
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the environment overrides.
    #[must_use]
    pub fn env(&self) -> &StringMap {
        &self.env
    }

    /// Returns the working directory.
    #[must_use]
    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    /// Returns the `when` predicate, if any.
    #[must_use]
    pub fn condition(&self) -> Option<&Predicate> {
        self.when.as_ref()
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("needs", &self.needs)
            .field("action", &self.action)
            .field("conditional", &self.when.is_some())
            .field("force", &self.force)
            .field("timeout", &self.timeout)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Unit`].
pub struct UnitBuilder {
    id: String,
    name: Option<String>,
    needs: Vec<String>,
    delegate: Option<Delegate>,
    handler: Option<HandlerRef>,
    when: Option<Predicate>,
    force: bool,
    timeout: Option<Duration>,
    env: StringMap,
    cwd: Option<String>,
}

impl UnitBuilder {
    /// Creates a builder for `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            needs: Vec::new(),
            delegate: None,
            handler: None,
            when: None,
            force: false,
            timeout: None,
            env: StringMap::new(),
            cwd: None,
        }
    }

    /// Returns the id being declared.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets the display name. Defaults to the id.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds dependencies.
    #[must_use]
    pub fn needs(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.needs.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Adds a single dependency.
    #[must_use]
    pub fn need(mut self, id: impl Into<String>) -> Self {
        self.needs.push(id.into());
        self
    }

    /// Sets an inline action.
    #[must_use]
    pub fn run<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.delegate = Some(Arc::new(move |ctx| func(ctx).boxed()));
        self
    }

    /// References a registered handler.
    #[must_use]
    pub fn uses(mut self, handler: impl Into<String>) -> Self {
        let with = self.handler.take().map(|h| h.with).unwrap_or_default();
        self.handler = Some(HandlerRef {
            uses: handler.into(),
            with,
        });
        self
    }

    /// Sets the action from an existing [`UnitAction`].
    #[must_use]
    pub fn action(self, action: UnitAction) -> Self {
        match action {
            UnitAction::Delegate(delegate) => Self {
                delegate: Some(delegate),
                ..self
            },
            UnitAction::Handler(reference) => Self {
                handler: Some(reference),
                ..self
            },
        }
    }

    /// Adds a handler input. Requires [`UnitBuilder::uses`].
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.handler
            .get_or_insert_with(|| HandlerRef::new(String::new()))
            .with
            .insert(key.into(), value.into());
        self
    }

    /// Sets the `when` predicate.
    #[must_use]
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&UnitContext) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(predicate));
        self
    }

    /// Runs the unit even if dependencies failed.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key, value);
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Builds the unit.
    ///
    /// Duplicate entries in `needs` are collapsed, keeping the first.
    ///
    /// # Errors
    ///
    /// Returns `UnitValidationError` for an empty id, a self dependency, or
    /// when the unit does not have exactly one action source.
    pub fn build(self) -> Result<Unit, UnitValidationError> {
        if self.id.trim().is_empty() {
            return Err(UnitValidationError::empty_id());
        }

        let handler = match self.handler {
            Some(h) if h.uses.is_empty() => {
                return Err(UnitValidationError::new(
                    &self.id,
                    "UNIT-INPUT-WITHOUT-HANDLER",
                    format!("Unit '{}' sets handler inputs without `uses`", self.id),
                ));
            }
            other => other,
        };

        let action = match (self.delegate, handler) {
            (Some(d), None) => UnitAction::Delegate(d),
            (None, Some(h)) => UnitAction::Handler(h),
            (Some(_), Some(_)) => return Err(UnitValidationError::conflicting_action(&self.id)),
            (None, None) => return Err(UnitValidationError::missing_action(&self.id)),
        };

        if self.needs.iter().any(|n| *n == self.id) {
            return Err(UnitValidationError::self_dependency(&self.id));
        }

        let mut needs: Vec<String> = Vec::with_capacity(self.needs.len());
        for need in self.needs {
            if !needs.contains(&need) {
                needs.push(need);
            }
        }

        Ok(Unit {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            needs,
            action,
            when: self.when,
            force: self.force,
            timeout: self.timeout,
            env: self.env,
            cwd: self.cwd,
        })
    }
}

impl fmt::Debug for UnitBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitBuilder")
            .field("id", &self.id)
            .field("needs", &self.needs)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Outputs;

    #[test]
    fn test_build_delegate_unit() {
        let unit = Unit::builder("build")
            .needs(["lint", "fmt", "lint"])
            .env("CI", "true")
            .timeout(Duration::from_secs(5))
            .run(|_ctx| async { Ok(Outputs::new()) })
            .build()
            .unwrap();

        assert_eq!(unit.id(), "build");
        assert_eq!(unit.name(), "build");
        assert_eq!(unit.needs(), ["lint".to_string(), "fmt".to_string()]);
        assert_eq!(unit.env().get("CI"), Some("true"));
        assert!(unit.action().uses().is_none());
        assert!(!unit.force());
    }

    #[test]
    fn test_build_handler_unit() {
        let unit = Unit::builder("deploy")
            .name("Deploy app")
            .uses("compose")
            .with_input("file", "docker-compose.yml")
            .force(true)
            .build()
            .unwrap();

        assert_eq!(unit.name(), "Deploy app");
        assert_eq!(unit.action().uses(), Some("compose"));
        match unit.action() {
            UnitAction::Handler(r) => assert_eq!(r.with.get("file"), Some(&Value::from("docker-compose.yml"))),
            UnitAction::Delegate(_) => panic!("expected handler action"),
        }
    }

    #[test]
    fn test_inputs_before_uses_are_kept() {
        let unit = Unit::builder("u")
            .with_input("a", 1)
            .uses("h")
            .build()
            .unwrap();
        assert_eq!(unit.action().uses(), Some("h"));
    }

    #[test]
    fn test_rejects_missing_action() {
        let err = Unit::builder("a").build().unwrap_err();
        assert_eq!(err.error_info.code, "UNIT-MISSING-ACTION");
    }

    #[test]
    fn test_rejects_both_actions() {
        let err = Unit::builder("a")
            .uses("h")
            .run(|_ctx| async { Ok(Outputs::new()) })
            .build()
            .unwrap_err();
        assert_eq!(err.error_info.code, "UNIT-CONFLICTING-ACTION");
    }

    #[test]
    fn test_rejects_inputs_without_handler() {
        let err = Unit::builder("a")
            .with_input("x", 1)
            .run(|_ctx| async { Ok(Outputs::new()) })
            .build()
            .unwrap_err();
        assert_eq!(err.error_info.code, "UNIT-INPUT-WITHOUT-HANDLER");
    }

    #[test]
    fn test_rejects_self_dependency_and_empty_id() {
        let err = Unit::builder("a").need("a").uses("h").build().unwrap_err();
        assert_eq!(err.unit, "a");

        assert!(Unit::builder("  ").uses("h").build().is_err());
    }
}
