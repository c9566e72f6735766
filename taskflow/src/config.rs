//! Executor configuration.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable for [`ExecutorConfig::default_timeout_ms`].
pub const ENV_DEFAULT_TIMEOUT_MS: &str = "TASKFLOW_DEFAULT_TIMEOUT_MS";
/// Environment variable for [`ExecutorConfig::cancel_grace_ms`].
pub const ENV_CANCEL_GRACE_MS: &str = "TASKFLOW_CANCEL_GRACE_MS";
/// Environment variable for [`ExecutorConfig::strict_outputs`].
pub const ENV_STRICT_OUTPUTS: &str = "TASKFLOW_STRICT_OUTPUTS";

/// Configuration for the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout applied to units that do not declare one.
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,
    /// How long a timed-out action may take to settle before it is detached.
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
    /// Fail units whose handler returns undeclared outputs.
    #[serde(default)]
    pub strict_outputs: bool,
}

fn default_cancel_grace_ms() -> u64 {
    250
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: None,
            cancel_grace_ms: default_cancel_grace_ms(),
            strict_outputs: false,
        }
    }
}

impl ExecutorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default unit timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the cancellation grace period.
    #[must_use]
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables or disables strict output checking.
    #[must_use]
    pub fn with_strict_outputs(mut self, strict: bool) -> Self {
        self.strict_outputs = strict;
        self
    }

    /// Gets the default timeout as a `Duration`.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// Gets the grace period as a `Duration`.
    #[must_use]
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    /// Loads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a malformed value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DEFAULT_TIMEOUT_MS) {
            config.default_timeout_ms = Some(parse(ENV_DEFAULT_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_CANCEL_GRACE_MS) {
            config.cancel_grace_ms = parse(ENV_CANCEL_GRACE_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_STRICT_OUTPUTS) {
            config.strict_outputs = parse_bool(ENV_STRICT_OUTPUTS, &raw)?;
        }

        Ok(config)
    }

    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Document` if the document is malformed.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(document).map_err(|e| ConfigError::Document(e.to_string()))
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
