//! Gear identity and persisted samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TelemetryRecord;

/// Internal gear identifier assigned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GearId(pub u64);

impl fmt::Display for GearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical address of a gear as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GearKey {
    pub hardware_id: u64,
    pub channel: u8,
    pub unit: u8,
}

impl GearKey {
    pub fn of(record: &TelemetryRecord) -> Self {
        Self {
            hardware_id: record.hardware_id,
            channel: record.channel,
            unit: record.unit,
        }
    }
}

impl fmt::Display for GearKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}/{}/{}", self.hardware_id, self.channel, self.unit)
    }
}

/// Persisted telemetry record, keyed by (gear, capture time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub gear_id: GearId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: TelemetryRecord,
}

impl Sample {
    pub fn new(gear_id: GearId, created_at: DateTime<Utc>, record: TelemetryRecord) -> Self {
        Self {
            gear_id,
            created_at,
            record,
        }
    }
}
