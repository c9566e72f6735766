//! Test assertions for run reports.

use crate::core::{RunReport, UnitStatus};

/// Asserts that `unit` finished with `expected`.
pub fn assert_status(report: &RunReport, unit: &str, expected: UnitStatus) {
    let actual = report.status_of(unit);
    assert_eq!(
        actual,
        Some(expected),
        "Expected unit '{}' to be {:?}, got {:?}",
        unit,
        expected,
        actual
    );
}

/// Asserts that `unit` succeeded.
pub fn assert_succeeded(report: &RunReport, unit: &str) {
    assert_status(report, unit, UnitStatus::Succeeded);
}

/// Asserts that `unit` failed.
pub fn assert_failed(report: &RunReport, unit: &str) {
    assert_status(report, unit, UnitStatus::Failed);
}

/// Asserts that `unit` was skipped.
pub fn assert_skipped(report: &RunReport, unit: &str) {
    assert_status(report, unit, UnitStatus::Skipped);
}

/// Asserts that `unit` was blocked.
pub fn assert_blocked(report: &RunReport, unit: &str) {
    assert_status(report, unit, UnitStatus::Blocked);
}

/// Asserts that `unit`'s error has the given taxonomy name.
pub fn assert_error_kind(report: &RunReport, unit: &str, kind: &str) {
    let actual = report
        .record(unit)
        .and_then(|r| r.error.as_ref())
        .map(crate::errors::UnitError::kind);
    assert_eq!(
        actual,
        Some(kind),
        "Expected unit '{}' to carry {}, got {:?}",
        unit,
        kind,
        actual
    );
}

/// Asserts that records appear in exactly this order.
pub fn assert_order(report: &RunReport, expected: &[&str]) {
    let actual: Vec<&str> = report.records.iter().map(|r| r.unit_id.as_str()).collect();
    assert_eq!(actual, expected, "Unexpected record order");
}
