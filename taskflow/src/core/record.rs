//! Run records and the per-run report.

use super::{Outputs, UnitStatus};
use crate::errors::UnitError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The terminal report for one unit within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// The unit id.
    pub unit_id: String,
    /// The unit's display name.
    pub name: String,
    /// The unit's status.
    pub status: UnitStatus,
    /// The error, for failed and blocked units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<UnitError>,
    /// Why the unit was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Outputs of a succeeded unit.
    #[serde(default, skip_serializing_if = "Outputs::is_empty")]
    pub outputs: Outputs,
    /// When the executor began the unit.
    pub started_at: Option<DateTime<Utc>>,
    /// When the unit reached its terminal status.
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// Creates a pending record.
    #[must_use]
    pub fn pending(unit_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            name: name.into(),
            status: UnitStatus::Pending,
            error: None,
            skip_reason: None,
            outputs: Outputs::new(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Marks the record as started.
    pub fn start(&mut self) {
        self.status = UnitStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Finalizes as succeeded.
    pub fn succeed(&mut self, outputs: Outputs) {
        self.status = UnitStatus::Succeeded;
        self.outputs = outputs;
        self.finish();
    }

    /// Finalizes as failed.
    pub fn fail(&mut self, error: UnitError) {
        self.status = UnitStatus::Failed;
        self.error = Some(error);
        self.finish();
    }

    /// Finalizes as skipped.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = UnitStatus::Skipped;
        self.skip_reason = Some(reason.into());
        self.finish();
    }

    /// Finalizes as blocked.
    pub fn block(&mut self, error: UnitError) {
        self.status = UnitStatus::Blocked;
        self.error = Some(error);
        self.finish();
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.started_at.get_or_insert(now);
        self.ended_at = Some(now);
    }

    /// Returns the wall-clock duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => {
                let micros = (end - start).num_microseconds().unwrap_or(0);
                #[allow(clippy::cast_precision_loss)]
                let ms = micros as f64 / 1000.0;
                ms
            }
            _ => 0.0,
        }
    }
}

/// Per-status counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total number of records.
    pub total: usize,
    /// Units that succeeded.
    pub succeeded: usize,
    /// Units that failed.
    pub failed: usize,
    /// Units whose predicate was false.
    pub skipped: usize,
    /// Units blocked by a dependency or cancellation.
    pub blocked: usize,
}

/// The full result of one executor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The run's id.
    pub run_id: Uuid,
    /// Records in execution order, including skipped and blocked units.
    pub records: Vec<RunRecord>,
    /// Total execution time in milliseconds.
    pub duration_ms: f64,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            records: Vec::new(),
            duration_ms: 0.0,
            cancelled: false,
        }
    }

    /// True when no record failed and the run was not cancelled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled && !self.records.iter().any(|r| r.status.is_failure())
    }

    /// Gets the record for a unit.
    ///
    /// If a unit ran more than once (e.g. across lifecycle stages), the last
    /// record wins.
    #[must_use]
    pub fn record(&self, unit_id: &str) -> Option<&RunRecord> {
        self.records.iter().rev().find(|r| r.unit_id == unit_id)
    }

    /// Gets the status of a unit.
    #[must_use]
    pub fn status_of(&self, unit_id: &str) -> Option<UnitStatus> {
        self.record(unit_id).map(|r| r.status)
    }

    /// Returns the failed records.
    #[must_use]
    pub fn failed(&self) -> Vec<&RunRecord> {
        self.records
            .iter()
            .filter(|r| r.status == UnitStatus::Failed)
            .collect()
    }

    /// Returns the id of the first failed unit, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.status == UnitStatus::Failed)
            .map(|r| r.unit_id.as_str())
    }

    /// Appends the records of another report.
    pub fn extend(&mut self, other: Self) {
        self.records.extend(other.records);
        self.duration_ms += other.duration_ms;
        self.cancelled |= other.cancelled;
    }

    /// Consumes the report, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<RunRecord> {
        self.records
    }

    /// Counts records by status.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.records.len(),
            ..RunSummary::default()
        };
        for record in &self.records {
            match record.status {
                UnitStatus::Succeeded => summary.succeeded += 1,
                UnitStatus::Failed => summary.failed += 1,
                UnitStatus::Skipped => summary.skipped += 1,
                UnitStatus::Blocked => summary.blocked += 1,
                UnitStatus::Pending | UnitStatus::Running => {}
            }
        }
        summary
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("success".to_string(), serde_json::json!(self.is_success()));
        map.insert("cancelled".to_string(), serde_json::json!(self.cancelled));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map.insert(
            "summary".to_string(),
            serde_json::to_value(self.summary()).unwrap_or_default(),
        );
        map.insert(
            "records".to_string(),
            serde_json::json!(self
                .records
                .iter()
                .map(|r| serde_json::json!({
                    "unit": r.unit_id,
                    "status": r.status.to_string(),
                    "error": r.error.as_ref().map(ToString::to_string),
                    "duration_ms": r.duration_ms(),
                }))
                .collect::<Vec<_>>()),
        );
        map
    }
}
