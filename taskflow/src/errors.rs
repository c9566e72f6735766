//! Error types for the taskflow engine.
//!
//! Build-time errors (`UnknownDependencyError`, `CycleDetectedError`,
//! `UnitValidationError`) abort a run before any unit executes. Execution-time
//! errors are `UnitError` values attached to a single unit's run record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for taskflow operations.
#[derive(Debug, Error)]
pub enum TaskflowError {
    /// A unit declaration was rejected.
    #[error("{0}")]
    Validation(#[from] UnitValidationError),

    /// A dependency or target references an undeclared unit.
    #[error("{0}")]
    UnknownDependency(#[from] UnknownDependencyError),

    /// The dependency graph contains a cycle.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A secret or environment key was written twice.
    #[error("{0}")]
    DataConflict(#[from] DataConflictError),

    /// A unit's outputs were recorded twice.
    #[error("{0}")]
    OutputConflict(#[from] OutputConflictError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A unit-level failure surfaced outside the executor.
    #[error("{0}")]
    Unit(#[from] UnitError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TaskflowError {
    /// Returns true for errors that are detected before anything executes.
    #[must_use]
    pub fn is_build_time(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnknownDependency(_) | Self::CycleDetected(_)
        )
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "GRAPH-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a unit declaration is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UnitValidationError {
    /// The error message.
    pub message: String,
    /// The unit involved.
    pub unit: String,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl UnitValidationError {
    /// Creates a new validation error for `unit`.
    #[must_use]
    pub fn new(unit: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error_info: ContractErrorInfo::new(code, message.clone()),
            message,
            unit: unit.into(),
        }
    }

    /// Sets the fix hint on the attached contract info.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.error_info = self.error_info.with_fix_hint(hint);
        self
    }

    /// The unit has neither an inline delegate nor a handler reference.
    #[must_use]
    pub fn missing_action(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        Self::new(
            &unit,
            "UNIT-MISSING-ACTION",
            format!("Unit '{unit}' declares no action"),
        )
        .with_fix_hint("Call `run(...)` or `uses(...)` on the builder.")
    }

    /// The unit was given both an inline delegate and a handler reference.
    #[must_use]
    pub fn conflicting_action(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        Self::new(
            &unit,
            "UNIT-CONFLICTING-ACTION",
            format!("Unit '{unit}' declares both an inline action and a handler"),
        )
        .with_fix_hint("A unit runs exactly one of `run(...)` or `uses(...)`.")
    }

    /// The unit lists itself in `needs`.
    #[must_use]
    pub fn self_dependency(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        Self::new(
            &unit,
            "UNIT-SELF-DEPENDENCY",
            format!("Unit '{unit}' cannot depend on itself"),
        )
    }

    /// The unit id is empty or whitespace-only.
    #[must_use]
    pub fn empty_id() -> Self {
        Self::new(
            "",
            "UNIT-EMPTY-ID",
            "Unit id cannot be empty or whitespace-only",
        )
    }
}

/// Error raised when a `needs` entry or a requested target is not declared.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct UnknownDependencyError {
    /// The unit whose `needs` referenced the missing id, or `None` for a target.
    pub dependent: Option<String>,
    /// The undeclared id.
    pub missing: String,
}

impl UnknownDependencyError {
    /// A `needs` entry of `dependent` names an undeclared unit.
    #[must_use]
    pub fn new(dependent: impl Into<String>, missing: impl Into<String>) -> Self {
        Self {
            dependent: Some(dependent.into()),
            missing: missing.into(),
        }
    }

    /// A requested target is not declared.
    #[must_use]
    pub fn target(missing: impl Into<String>) -> Self {
        Self {
            dependent: None,
            missing: missing.into(),
        }
    }

    fn describe(&self) -> String {
        match &self.dependent {
            Some(dependent) => format!(
                "Unit '{}' depends on unknown unit '{}'",
                dependent, self.missing
            ),
            None => format!("Requested unit '{}' is not declared", self.missing),
        }
    }

    /// Returns contract error info for diagnostics.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new("GRAPH-MISSING-DEP", self.describe())
            .with_fix_hint("Check for typos in unit ids, or splice the unit in with `add`.")
            .with_context_entry("missing", self.missing.clone())
    }
}

impl fmt::Display for UnknownDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Error raised when a cycle is detected in the dependency graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cycle detected: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of units forming the cycle; first and last entries are equal.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }

    /// Returns contract error info for diagnostics.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        ContractErrorInfo::new(
            "GRAPH-CYCLE",
            format!("Dependency cycle: {}", self.cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the `needs` edges in the cycle to break it.")
    }
}

/// Error raised when writing to an existing key in an append-only bag.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Data conflict: key '{key}' already exists")]
pub struct DataConflictError {
    /// The conflicting key.
    pub key: String,
}

impl DataConflictError {
    /// Creates a new data conflict error.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Error raised when a unit's outputs are recorded twice in one run.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Output conflict for unit '{unit}': {message}")]
pub struct OutputConflictError {
    /// The unit id.
    pub unit: String,
    /// Additional message.
    pub message: String,
}

impl OutputConflictError {
    /// Creates a new output conflict error.
    #[must_use]
    pub fn new(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            message: message.into(),
        }
    }
}

/// Error raised when configuration cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value of the wrong shape.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        /// The variable name.
        key: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration document failed to parse.
    #[error("Invalid configuration document: {0}")]
    Document(String),

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),
}

/// Execution-time error confined to a single unit.
///
/// These never escape `Executor::run`; they are recorded on the unit's
/// `RunRecord`.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitError {
    /// The unit's `uses` name has no registered handler.
    #[error("No handler registered for '{uses}'")]
    HandlerNotFound {
        /// The requested handler name.
        uses: String,
    },

    /// The `with` payload does not satisfy the handler's input contract.
    #[error("Invalid input for handler '{handler}': {reason}")]
    InvalidInput {
        /// The handler name.
        handler: String,
        /// What was wrong.
        reason: String,
    },

    /// The unit exceeded its timeout.
    #[error("Unit '{unit}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The unit id.
        unit: String,
        /// The timeout that expired.
        timeout_ms: u64,
    },

    /// The action panicked.
    #[error("Action panicked: {message}")]
    ActionPanic {
        /// The panic payload, if it was a string.
        message: String,
    },

    /// A dependency failed or was blocked and the unit is not forced.
    #[error("Blocked by failed dependency '{dependency}'")]
    BlockedByDependency {
        /// The dependency that caused the block.
        dependency: String,
    },

    /// The run was cancelled before the unit started.
    #[error("Run cancelled: {reason}")]
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },

    /// The execution order referenced an id absent from the unit map.
    #[error("Unit '{unit}' is not declared")]
    NotDeclared {
        /// The missing unit id.
        unit: String,
    },

    /// The unit's outputs could not be recorded.
    #[error("{0}")]
    OutputConflict(OutputConflictError),

    /// The action reported a failure.
    #[error("{message}")]
    Failed {
        /// The failure message.
        message: String,
        /// An optional underlying cause.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
}

impl UnitError {
    /// Creates a plain failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a failure with an underlying cause.
    #[must_use]
    pub fn failed_with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            handler: handler.into(),
            reason: reason.into(),
        }
    }

    /// Returns the taxonomy name of this error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HandlerNotFound { .. } => "HandlerNotFoundError",
            Self::InvalidInput { .. } => "InvalidInputError",
            Self::Timeout { .. } => "TimeoutError",
            Self::ActionPanic { .. } => "ActionPanic",
            Self::BlockedByDependency { .. } => "BlockedByDependencyError",
            Self::Cancelled { .. } => "CancelledError",
            Self::NotDeclared { .. } => "NotDeclaredError",
            Self::OutputConflict(_) => "OutputConflictError",
            Self::Failed { .. } => "Error",
        }
    }

    /// Returns the underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::Failed { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for UnitError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed {
            message: err.to_string(),
            cause: err.chain().nth(1).map(ToString::to_string),
        }
    }
}

impl From<OutputConflictError> for UnitError {
    fn from(err: OutputConflictError) -> Self {
        Self::OutputConflict(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_detected_error() {
        let err = CycleDetectedError::new(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);

        assert!(err.to_string().contains("a -> b -> a"));
        assert_eq!(err.error_info().code, "GRAPH-CYCLE");
    }

    #[test]
    fn test_unknown_dependency_messages() {
        let err = UnknownDependencyError::new("deploy", "ghost");
        assert_eq!(err.to_string(), "Unit 'deploy' depends on unknown unit 'ghost'");
        assert_eq!(err.error_info().code, "GRAPH-MISSING-DEP");

        let err = UnknownDependencyError::target("ghost");
        assert_eq!(err.to_string(), "Requested unit 'ghost' is not declared");
    }

    #[test]
    fn test_validation_error_codes() {
        assert_eq!(
            UnitValidationError::missing_action("a").error_info.code,
            "UNIT-MISSING-ACTION"
        );
        assert_eq!(
            UnitValidationError::conflicting_action("a").error_info.code,
            "UNIT-CONFLICTING-ACTION"
        );
        assert!(UnitValidationError::self_dependency("a")
            .to_string()
            .contains("cannot depend on itself"));
    }

    #[test]
    fn test_unit_error_from_anyhow_keeps_cause() {
        let err = anyhow::anyhow!("disk full").context("writing artifact");
        let unit_err = UnitError::from(err);

        assert_eq!(unit_err.to_string(), "writing artifact");
        assert_eq!(unit_err.cause(), Some("disk full"));
        assert_eq!(unit_err.kind(), "Error");
    }

    #[test]
    fn test_unit_error_serializes_tagged() {
        let err = UnitError::Timeout {
            unit: "slow".to_string(),
            timeout_ms: 10,
        };
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], "timeout");
        assert_eq!(json["timeout_ms"], 10);
        assert_eq!(err.kind(), "TimeoutError");
    }

    #[test]
    fn test_build_time_classification() {
        let err: TaskflowError = CycleDetectedError::new(vec!["a".into(), "a".into()]).into();
        assert!(err.is_build_time());

        let err: TaskflowError = UnitError::failed("boom").into();
        assert!(!err.is_build_time());
    }
}
