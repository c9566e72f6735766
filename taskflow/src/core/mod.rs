//! Core value types for taskflow.
//!
//! This module contains the small containers every other module passes around:
//! - Unit status enum
//! - Ordered outputs and string maps
//! - Run records and the run report

mod outputs;
mod record;
mod status;
mod string_map;

pub use outputs::{ActionResult, Outputs};
pub use record::{RunRecord, RunReport, RunSummary};
pub use status::UnitStatus;
pub use string_map::StringMap;
