//! Mock handlers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::context::UnitContext;
use crate::core::{ActionResult, Outputs};
use crate::errors::UnitError;
use crate::handlers::Handler;

/// A handler that records calls and returns configurable outputs.
///
/// Register it behind an `Arc` to keep a handle for assertions.
#[derive(Debug, Default)]
pub struct MockHandler {
    outputs: Mutex<Outputs>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// A recorded handler call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The unit that dispatched the call.
    pub unit_id: String,
    /// The validated inputs.
    pub inputs: Map<String, Value>,
}

impl MockHandler {
    /// Creates a mock returning empty outputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock returning `outputs`.
    #[must_use]
    pub fn with_outputs(outputs: Outputs) -> Self {
        Self {
            outputs: Mutex::new(outputs),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the outputs to return.
    pub fn set_outputs(&self, outputs: Outputs) {
        *self.outputs.lock() = outputs;
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the unit ids that called the handler, in order.
    #[must_use]
    pub fn called_units(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.unit_id.clone()).collect()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Handler for MockHandler {
    async fn run(&self, ctx: UnitContext) -> ActionResult {
        self.calls.lock().push(RecordedCall {
            unit_id: ctx.unit_id().to_string(),
            inputs: ctx.inputs().clone(),
        });
        Ok(self.outputs.lock().clone())
    }
}

/// A handler that always fails.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    /// Creates a failing handler.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Handler for FailingHandler {
    async fn run(&self, _ctx: UnitContext) -> ActionResult {
        Err(UnitError::failed(self.message.clone()))
    }
}

/// A handler that panics.
#[derive(Debug, Clone)]
pub struct PanickingHandler {
    message: String,
}

impl PanickingHandler {
    /// Creates a panicking handler.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Handler for PanickingHandler {
    async fn run(&self, _ctx: UnitContext) -> ActionResult {
        panic!("{}", self.message)
    }
}

/// A handler that takes time to finish.
#[derive(Debug, Clone)]
pub struct SlowHandler {
    delay: Duration,
    cooperative: bool,
}

impl SlowHandler {
    /// Creates a handler that sleeps for `delay`, ignoring cancellation.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            cooperative: false,
        }
    }

    /// Creates a slow handler with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Stops sleeping as soon as the unit is cancelled.
    #[must_use]
    pub fn cooperative(mut self) -> Self {
        self.cooperative = true;
        self
    }
}

#[async_trait]
impl Handler for SlowHandler {
    async fn run(&self, ctx: UnitContext) -> ActionResult {
        if self.cooperative {
            tokio::select! {
                () = tokio::time::sleep(self.delay) => {}
                () = ctx.cancelled() => {
                    return Err(UnitError::Cancelled {
                        reason: ctx.cancellation().reason().unwrap_or_default(),
                    });
                }
            }
        } else {
            tokio::time::sleep(self.delay).await;
        }

        let slept = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX);
        Ok(Outputs::new().with("slept_ms", slept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use std::sync::Arc;

    fn ctx(unit: &str) -> UnitContext {
        UnitContext::new(Arc::new(RunContext::new()), unit, unit)
    }

    #[tokio::test]
    async fn test_mock_handler_records_calls() {
        let mock = MockHandler::with_outputs(Outputs::new().with("ok", true));
        let outputs = mock.run(ctx("a")).await.unwrap();
        mock.run(ctx("b")).await.unwrap();

        assert_eq!(outputs.get("ok"), Some(&Value::Bool(true)));
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.called_units(), vec!["a", "b"]);

        mock.reset();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_handler() {
        let err = FailingHandler::new("nope").run(ctx("a")).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn test_cooperative_slow_handler_stops_on_cancel() {
        let unit = ctx("a");
        unit.cancellation().cancel("stop");

        let err = SlowHandler::new(Duration::from_secs(30))
            .cooperative()
            .run(unit)
            .await
            .unwrap_err();
        assert!(matches!(err, UnitError::Cancelled { .. }));
    }
}
