//! Analytics output types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{GearId, Sample, TelemetryRecord};

/// Aggregation slot keyed by weekday (0 = Sunday) or hour of day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    pub active_energy: f64,
    pub apparent_energy: f64,
    pub loadside_energy: f64,
    pub light_source_on_time: f64,
    pub light_source_start_count: f64,
    pub control_gear_voltage: f64,
    pub control_gear_voltage_frequence: f64,
    pub device_arc: f64,
    /// Adjacent sample pairs attributed to this bucket
    #[serde(skip)]
    pub pairs: u32,
}

/// Buckets keyed by weekday or hour of day.
pub type BucketMap = BTreeMap<u8, AggregateBucket>;

/// Light-source fault counters watched by the error detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCounter {
    LightSourceFailureCount,
    LightSourceOpenCount,
    LightSourceShortCount,
    LightSourceThermalShutdownCount,
    LightSourceThermalDeratingCount,
}

impl FaultCounter {
    pub const ALL: [Self; 5] = [
        Self::LightSourceFailureCount,
        Self::LightSourceOpenCount,
        Self::LightSourceShortCount,
        Self::LightSourceThermalShutdownCount,
        Self::LightSourceThermalDeratingCount,
    ];

    pub fn read(self, record: &TelemetryRecord) -> u8 {
        match self {
            Self::LightSourceFailureCount => record.light_source_failure_count,
            Self::LightSourceOpenCount => record.light_source_open_count,
            Self::LightSourceShortCount => record.light_source_short_count,
            Self::LightSourceThermalShutdownCount => record.light_source_thermal_shutdown_count,
            Self::LightSourceThermalDeratingCount => record.light_source_thermal_derating_count,
        }
    }
}

/// Sample at which at least one fault counter increased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPoint {
    #[serde(flatten)]
    pub sample: Sample,
    pub triggered_by: Vec<FaultCounter>,
}

/// Highest failure counts seen for one gear inside a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultMaximum {
    pub gear_id: GearId,
    /// Capture time of the sample holding the maximum
    pub created_at: DateTime<Utc>,
    pub light_source_failure_count: u8,
    pub control_gear_failure_count: u8,
}

/// Live view of one gear: latest fields plus today's deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub latest: Sample,
    #[serde(rename = "isDC")]
    pub is_dc: bool,
    #[serde(rename = "onTimeRate")]
    pub on_time_rate: f64,
    #[serde(rename = "startCount")]
    pub start_count: f64,
    #[serde(rename = "energyUsage")]
    pub energy_usage: f64,
}

/// Daily, hour-of-day and weekday views of a config group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAnalysis {
    pub day: BTreeMap<GearId, Vec<Sample>>,
    /// `None` for gears with too few samples for an hourly profile
    pub hour: BTreeMap<GearId, Option<BucketMap>>,
    pub week: BTreeMap<GearId, BucketMap>,
}

/// Resolution of the history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStep {
    /// Every sample of the last few hours
    Minute,
    /// One sample per hour over the last day
    Hour,
}

impl FromStr for HistoryStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            other => Err(format!("step must be hour or minute, got '{other}'")),
        }
    }
}

impl fmt::Display for HistoryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
        }
    }
}

/// Samples as one shared key list plus a value row per sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleColumns {
    pub keys: Vec<String>,
    pub values: Vec<Vec<serde_json::Value>>,
}

impl SampleColumns {
    /// Keys come from the first sample's JSON form. Empty input yields
    /// empty keys.
    pub fn from_samples(samples: &[Sample]) -> Result<Self, serde_json::Error> {
        let mut columns = Self::default();
        for sample in samples {
            let serde_json::Value::Object(fields) = serde_json::to_value(sample)? else {
                continue;
            };
            if columns.keys.is_empty() {
                columns.keys = fields.keys().cloned().collect();
            }
            let row = columns
                .keys
                .iter()
                .map(|k| fields.get(k).cloned().unwrap_or(serde_json::Value::Null))
                .collect();
            columns.values.push(row);
        }
        Ok(columns)
    }
}
