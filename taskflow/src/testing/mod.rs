//! Testing utilities for taskflow runs.
//!
//! This module provides:
//! - Mock handlers (recording, failing, panicking, slow)
//! - A `TestRun` fixture wiring a registry, a collecting writer and a context
//! - Assertions over run reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_blocked, assert_error_kind, assert_failed, assert_order, assert_skipped,
    assert_status, assert_succeeded,
};
pub use fixtures::TestRun;
pub use mocks::{FailingHandler, MockHandler, PanickingHandler, RecordedCall, SlowHandler};
