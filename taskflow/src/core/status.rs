//! Unit status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a unit within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Unit has not been considered yet.
    #[default]
    Pending,
    /// Unit action is in flight.
    Running,
    /// Unit action returned outputs.
    Succeeded,
    /// Unit action failed, panicked, timed out, or could not be dispatched.
    Failed,
    /// Unit's `when` predicate evaluated to false.
    Skipped,
    /// A dependency failed or was blocked and the unit is not forced.
    Blocked,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl UnitStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Skipped | Self::Blocked
        )
    }

    /// Returns true if the status counts against overall run success.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true if a non-forced dependent must be blocked.
    ///
    /// `Skipped` is deliberately excluded.
    #[must_use]
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, Self::Failed | Self::Blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_status_display() {
        assert_eq!(UnitStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(UnitStatus::Blocked.to_string(), "blocked");
        assert_eq!(UnitStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn test_unit_status_is_terminal() {
        assert!(UnitStatus::Succeeded.is_terminal());
        assert!(UnitStatus::Skipped.is_terminal());
        assert!(UnitStatus::Blocked.is_terminal());
        assert!(!UnitStatus::Pending.is_terminal());
        assert!(!UnitStatus::Running.is_terminal());
    }

    #[test]
    fn test_skip_does_not_block() {
        assert!(UnitStatus::Failed.blocks_dependents());
        assert!(UnitStatus::Blocked.blocks_dependents());
        assert!(!UnitStatus::Skipped.blocks_dependents());
        assert!(!UnitStatus::Blocked.is_failure());
    }

    #[test]
    fn test_unit_status_serialize() {
        let json = serde_json::to_string(&UnitStatus::Skipped).unwrap();
        assert_eq!(json, r#""skipped""#);

        let status: UnitStatus = serde_json::from_str(r#""failed""#).unwrap();
        assert_eq!(status, UnitStatus::Failed);
    }
}
