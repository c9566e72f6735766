//! Handler registry.

use super::{FnHandler, Handler, InputSchema, OutputSchema};
use crate::context::UnitContext;
use crate::core::ActionResult;
use crate::errors::UnitError;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A registered handler and its declared contracts.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    /// The name units reference with `uses`.
    pub name: String,
    /// Description of what the handler does.
    pub description: String,
    /// Declared inputs.
    pub inputs: InputSchema,
    /// Declared outputs.
    pub outputs: OutputSchema,
    handler: Arc<dyn Handler>,
}

impl HandlerDescriptor {
    /// Creates a descriptor with no declared contracts.
    ///
    /// Until [`HandlerDescriptor::with_inputs`] declares a schema, every
    /// `with` key is passed through unchecked.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            inputs: InputSchema::permissive(),
            outputs: OutputSchema::new(),
            handler: Arc::new(handler),
        }
    }

    /// Creates a descriptor backed by an async closure.
    #[must_use]
    pub fn from_fn<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        let name = name.into();
        Self::new(name.clone(), FnHandler::new(name, func))
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_inputs(mut self, inputs: InputSchema) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets the output schema.
    #[must_use]
    pub fn with_outputs(mut self, outputs: OutputSchema) -> Self {
        self.outputs = outputs;
        self
    }

    /// Returns the handler implementation.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Validates a `with` payload against the input schema.
    pub fn validate_inputs(&self, with: &Map<String, Value>) -> Result<Map<String, Value>, UnitError> {
        self.inputs.validate(&self.name, with)
    }
}

/// Registry mapping handler names to descriptors.
///
/// The registry is a constructed value handed to the executor; there is no
/// global instance.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<HandlerDescriptor>>>,
}

impl HandlerRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under its name, returning the one it replaced.
    pub fn register(&self, descriptor: HandlerDescriptor) -> Option<Arc<HandlerDescriptor>> {
        let name = descriptor.name.clone();
        let previous = self.handlers.write().insert(name.clone(), Arc::new(descriptor));
        if previous.is_some() {
            tracing::debug!(handler = %name, "Replaced registered handler");
        }
        previous
    }

    /// Removes a handler.
    pub fn unregister(&self, name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.handlers.write().remove(name)
    }

    /// Looks up a handler.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.handlers.read().get(name).cloned()
    }

    /// Resolves a handler for dispatch.
    ///
    /// # Errors
    ///
    /// Returns `UnitError::HandlerNotFound` if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<HandlerDescriptor>, UnitError> {
        self.get(name).ok_or_else(|| UnitError::HandlerNotFound {
            uses: name.to_string(),
        })
    }

    /// Checks if a handler is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Lists registered handler names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::core::Outputs;
    use crate::handlers::{InputSpec, ValueKind};
    use crate::testing::MockHandler;
    use serde_json::json;

    fn echo() -> HandlerDescriptor {
        HandlerDescriptor::from_fn("echo", |ctx: UnitContext| async move {
            let message = ctx.input_str("message").unwrap_or_default().to_string();
            Ok(Outputs::new().with("echoed", message))
        })
        .with_description("Echoes its input")
        .with_inputs(InputSchema::new().with(InputSpec::new("message", ValueKind::String).required()))
        .with_outputs(["echoed"].into_iter().collect())
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = HandlerRegistry::new();
        assert!(registry.register(echo()).is_none());

        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo"]);
        assert_eq!(registry.resolve("echo").unwrap().description, "Echoes its input");
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = HandlerRegistry::new();
        registry.register(echo());
        let previous = registry.register(echo().with_description("v2"));

        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("echo").unwrap().description, "v2");
    }

    #[test]
    fn test_resolve_missing() {
        let registry = HandlerRegistry::new();
        let err = registry.resolve("docker").unwrap_err();
        assert_eq!(
            err,
            UnitError::HandlerNotFound {
                uses: "docker".to_string()
            }
        );
    }

    #[test]
    fn test_undeclared_contract_passes_inputs_through() {
        let descriptor = HandlerDescriptor::new("shell", MockHandler::new());
        let with = match json!({"script": "make test"}) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let inputs = descriptor.validate_inputs(&with).unwrap();
        assert_eq!(inputs.get("script"), Some(&json!("make test")));

        let strict = descriptor.with_inputs(InputSchema::new());
        assert!(strict.validate_inputs(&with).is_err());
    }

    #[tokio::test]
    async fn test_run_through_descriptor() {
        let descriptor = echo();
        let with = match json!({"message": "hi"}) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let inputs = descriptor.validate_inputs(&with).unwrap();
        let ctx = UnitContext::new(Arc::new(RunContext::new()), "say", "Say").with_inputs(inputs);

        let outputs = descriptor.handler().run(ctx).await.unwrap();
        assert_eq!(outputs.get("echoed"), Some(&json!("hi")));
    }
}
