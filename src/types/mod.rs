//! Shared data structures for DALI-2 telemetry
//!
//! - TelemetryRecord: one decoded frame
//! - GearKey / GearId / Sample: identity and persisted form
//! - AggregateBucket, ErrorPoint, StatusSnapshot: analytics outputs

mod analytics;
mod gear;
mod telemetry;

pub use analytics::*;
pub use gear::*;
pub use telemetry::*;
