//! Read-side entry points used by the HTTP API
//!
//! Each method fetches from the [`SampleStore`] and hands owned vectors to
//! the pure functions of the sibling modules. Methods suffixed `_at` take
//! the current time explicitly.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::buckets::{group_by_hour_of_day, group_by_weekday};
use super::calendar::Calendar;
use super::faults::{find_error_points, max_faults};
use super::reduce::{reduce_daily, reduce_hourly};
use super::status::build_status;
use crate::config::AnalyticsConfig;
use crate::registry::{GearRegistry, RegistryError};
use crate::storage::{PersistenceError, SampleQuery, SampleStore};
use crate::types::{
    ErrorPoint, FaultMaximum, GearId, GroupAnalysis, HistoryStep, Sample, SampleColumns, StatusSnapshot,
};

/// Errors surfaced to analytics callers. None of them affect ingestion.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("sample query failed: {0}")]
    Query(#[from] PersistenceError),
    #[error("registry lookup failed: {0}")]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    InvalidStep(String),
    #[error("sample encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Samples keyed by gear, every gear of the group present.
pub type GearSamples = BTreeMap<GearId, Vec<Sample>>;

/// Analytics over the sample store for config groups and single gears.
#[derive(Clone)]
pub struct AnalyticsService {
    registry: Arc<dyn GearRegistry>,
    store: Arc<dyn SampleStore>,
    calendar: Calendar,
    config: AnalyticsConfig,
}

impl AnalyticsService {
    pub fn new(
        registry: Arc<dyn GearRegistry>,
        store: Arc<dyn SampleStore>,
        calendar: Calendar,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            registry,
            store,
            calendar,
            config,
        }
    }

    /// Parse a history step name, mapping failures to [`AnalyticsError::InvalidStep`].
    pub fn parse_step(step: &str) -> Result<HistoryStep, AnalyticsError> {
        step.parse().map_err(AnalyticsError::InvalidStep)
    }

    fn group_samples(
        &self,
        config_id: u32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        descending: bool,
    ) -> Result<GearSamples, AnalyticsError> {
        let gears = self.registry.gears_in_group(config_id)?;
        let mut query = SampleQuery::new(gears.clone(), from, to);
        if descending {
            query = query.descending();
        }
        let samples = self.store.query(&query)?;
        debug!(config_id, gears = gears.len(), samples = samples.len(), "Group samples fetched");

        let mut by_gear: GearSamples = gears.into_iter().map(|id| (id, Vec::new())).collect();
        for sample in samples {
            by_gear.entry(sample.gear_id).or_default().push(sample);
        }
        Ok(by_gear)
    }

    fn gear_samples(
        &self,
        gear_id: GearId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        descending: bool,
    ) -> Result<Vec<Sample>, AnalyticsError> {
        let mut query = SampleQuery::new(vec![gear_id], from, to);
        if descending {
            query = query.descending();
        }
        Ok(self.store.query(&query)?)
    }

    // ========================================================================
    // History
    // ========================================================================

    pub fn history(&self, config_id: u32, step: HistoryStep) -> Result<GearSamples, AnalyticsError> {
        self.history_at(config_id, step, Utc::now())
    }

    /// Recent samples of every gear in the group, newest first.
    ///
    /// `Minute`: every sample of the minute window. `Hour`: the earliest
    /// sample of each hour within the hour window.
    pub fn history_at(
        &self,
        config_id: u32,
        step: HistoryStep,
        now: DateTime<Utc>,
    ) -> Result<GearSamples, AnalyticsError> {
        let to = DateTime::<Utc>::MAX_UTC;
        match step {
            HistoryStep::Minute => {
                let from = now - Duration::hours(self.config.minute_history_hours);
                self.group_samples(config_id, from, to, true)
            }
            HistoryStep::Hour => {
                let from = now - Duration::hours(self.config.hour_history_hours);
                let by_gear = self.group_samples(config_id, from, to, true)?;
                Ok(by_gear
                    .into_iter()
                    .map(|(gear_id, samples)| {
                        let mut hourly = reduce_hourly(samples, &self.calendar);
                        hourly.reverse();
                        (gear_id, hourly)
                    })
                    .collect())
            }
        }
    }

    // ========================================================================
    // Group analysis
    // ========================================================================

    /// Daily, hour-of-day and weekday views of every gear in the group over
    /// `[start, end)`.
    pub fn analysis(
        &self,
        config_id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<GroupAnalysis, AnalyticsError> {
        let by_gear = self.group_samples(config_id, start, end, true)?;
        let mut analysis = GroupAnalysis::default();

        for (gear_id, samples) in by_gear {
            analysis.day.insert(gear_id, reduce_daily(samples.clone(), &self.calendar));
            analysis
                .hour
                .insert(gear_id, group_by_hour_of_day(samples.clone(), &self.calendar));
            analysis.week.insert(gear_id, group_by_weekday(samples, &self.calendar));
        }
        Ok(analysis)
    }

    // ========================================================================
    // Faults
    // ========================================================================

    /// Fault events of one gear over `[start, end)`, oldest first.
    pub fn error_points(
        &self,
        gear_id: GearId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ErrorPoint>, AnalyticsError> {
        let samples = self.gear_samples(gear_id, start, end, false)?;
        Ok(find_error_points(samples))
    }

    /// Every sample of one gear around `at`, newest first.
    pub fn error_point_context(
        &self,
        gear_id: GearId,
        at: DateTime<Utc>,
    ) -> Result<Vec<Sample>, AnalyticsError> {
        let half_width = Duration::hours(self.config.error_context_hours);
        self.gear_samples(gear_id, at - half_width, at + half_width, true)
    }

    pub fn max_faults(&self, config_id: u32) -> Result<Vec<FaultMaximum>, AnalyticsError> {
        self.max_faults_at(config_id, Utc::now())
    }

    /// Per-gear fault maxima over the fault window, gears without faults omitted.
    pub fn max_faults_at(
        &self,
        config_id: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<FaultMaximum>, AnalyticsError> {
        let from = self.calendar.months_before(now, self.config.fault_window_months);
        let by_gear = self.group_samples(config_id, from, now, false)?;
        Ok(by_gear
            .into_iter()
            .filter_map(|(gear_id, samples)| max_faults(gear_id, samples))
            .collect())
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn status(&self, config_id: u32) -> Result<BTreeMap<GearId, StatusSnapshot>, AnalyticsError> {
        self.status_at(config_id, Utc::now())
    }

    /// Snapshot of every gear with samples since local midnight.
    pub fn status_at(
        &self,
        config_id: u32,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<GearId, StatusSnapshot>, AnalyticsError> {
        let day_start = self.calendar.start_of_day(now);
        let by_gear = self.group_samples(config_id, day_start, DateTime::<Utc>::MAX_UTC, true)?;
        Ok(by_gear
            .into_iter()
            .filter_map(|(gear_id, today)| {
                build_status(today, day_start, now).map(|status| (gear_id, status))
            })
            .collect())
    }

    // ========================================================================
    // Raw samples
    // ========================================================================

    /// Newest samples of one gear; `limit` is capped at the configured maximum.
    pub fn raw_samples(&self, gear_id: GearId, limit: usize) -> Result<Vec<Sample>, AnalyticsError> {
        let limit = limit.min(self.config.raw_sample_limit);
        let query = SampleQuery::new(vec![gear_id], DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
            .descending()
            .with_limit(limit);
        Ok(self.store.query(&query)?)
    }

    /// [`raw_samples`](Self::raw_samples) as one key list plus value rows.
    pub fn raw_columns(&self, gear_id: GearId, limit: usize) -> Result<SampleColumns, AnalyticsError> {
        Ok(SampleColumns::from_samples(&self.raw_samples(gear_id, limit)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{sample_at, t0};
    use crate::registry::{GearEntry, RegistryFile, ServerEntry, StaticRegistry};
    use crate::storage::InMemorySampleStore;
    use crate::types::FaultCounter;
    use approx::assert_relative_eq;

    const SERVER: u64 = 77;

    fn service_with(samples: &[Sample]) -> AnalyticsService {
        let file = RegistryFile {
            servers: vec![ServerEntry { id: SERVER, config_id: 15, host: String::new() }],
            gears: (1..=2)
                .map(|id| GearEntry { id, server_id: SERVER, channel: 0, unit: id as u8, name: String::new() })
                .collect(),
        };
        let store = InMemorySampleStore::new();
        for sample in samples {
            store.append(sample).unwrap();
        }
        AnalyticsService::new(
            Arc::new(StaticRegistry::from_file(&file)),
            Arc::new(store),
            Calendar::utc(),
            AnalyticsConfig::default(),
        )
    }

    #[test]
    fn test_history_minute_newest_first() {
        let now = t0() + Duration::hours(10);
        let samples = [
            sample_at(now - Duration::hours(4)).gear(1).build(),
            sample_at(now - Duration::hours(2)).gear(1).build(),
            sample_at(now - Duration::minutes(5)).gear(1).build(),
        ];
        let service = service_with(&samples);

        let history = service.history_at(15, HistoryStep::Minute, now).unwrap();
        let gear1 = &history[&GearId(1)];
        assert_eq!(gear1.len(), 2);
        assert_eq!(gear1[0].created_at, now - Duration::minutes(5));
        // gear 2 has no data but is still listed
        assert!(history[&GearId(2)].is_empty());
    }

    #[test]
    fn test_history_hour_one_per_hour() {
        let now = t0() + Duration::hours(10);
        let samples: Vec<_> = (0..12)
            .map(|i| sample_at(t0() + Duration::hours(6) + Duration::minutes(20 * i)).gear(2).build())
            .collect();
        let service = service_with(&samples);

        let history = service.history_at(15, HistoryStep::Hour, now).unwrap();
        let gear2 = &history[&GearId(2)];
        assert_eq!(gear2.len(), 4);
        assert_eq!(gear2[0].created_at, t0() + Duration::hours(9));
        assert_eq!(gear2[3].created_at, t0() + Duration::hours(6));
    }

    #[test]
    fn test_invalid_step() {
        assert!(matches!(
            AnalyticsService::parse_step("day"),
            Err(AnalyticsError::InvalidStep(msg)) if msg.contains("hour or minute")
        ));
        assert_eq!(AnalyticsService::parse_step("hour").unwrap(), HistoryStep::Hour);
    }

    #[test]
    fn test_analysis_covers_each_gear() {
        let samples: Vec<_> = (0..30)
            .map(|h| sample_at(t0() + Duration::hours(h)).gear(1).energy(h as f64).build())
            .collect();
        let service = service_with(&samples);

        let analysis = service.analysis(15, t0(), t0() + Duration::days(7)).unwrap();
        assert_eq!(analysis.day[&GearId(1)].len(), 2);
        assert!(analysis.hour[&GearId(1)].is_some());
        assert!(analysis.hour[&GearId(2)].is_none());
        assert_relative_eq!(analysis.week[&GearId(1)][&1].active_energy, 29.0 - 23.0);
        assert_eq!(analysis.week[&GearId(2)].len(), 7);
    }

    #[test]
    fn test_error_points_and_context() {
        let rise = sample_at(t0() + Duration::hours(2))
            .gear(1)
            .fault(FaultCounter::LightSourceFailureCount, 1)
            .build();
        let samples = [
            sample_at(t0()).gear(1).build(),
            rise.clone(),
            sample_at(t0() + Duration::days(3)).gear(1).fault(FaultCounter::LightSourceFailureCount, 1).build(),
        ];
        let service = service_with(&samples);

        let points = service.error_points(GearId(1), t0(), t0() + Duration::days(5)).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].sample, rise);

        let context = service.error_point_context(GearId(1), rise.created_at).unwrap();
        assert_eq!(context.len(), 2);
        assert_eq!(context[0], rise);
    }

    #[test]
    fn test_max_faults_window() {
        let now = t0() + Duration::days(100);
        let samples = [
            // outside the two-month window
            sample_at(t0()).gear(1).cg_failures(5).build(),
            sample_at(now - Duration::days(3)).gear(2).cg_failures(1).build(),
        ];
        let service = service_with(&samples);

        let maxima = service.max_faults_at(15, now).unwrap();
        assert_eq!(maxima.len(), 1);
        assert_eq!(maxima[0].gear_id, GearId(2));
    }

    #[test]
    fn test_status_since_midnight() {
        let now = t0() + Duration::days(1) + Duration::hours(4);
        let samples = [
            sample_at(t0() + Duration::hours(20)).gear(1).start_count(1).build(),
            sample_at(now - Duration::hours(3)).gear(1).start_count(5).build(),
            sample_at(now - Duration::hours(2)).gear(1).start_count(6).build(),
            sample_at(now - Duration::hours(1)).gear(1).start_count(9).build(),
        ];
        let service = service_with(&samples);

        let status = service.status_at(15, now).unwrap();
        assert_eq!(status.len(), 1);
        assert_relative_eq!(status[&GearId(1)].start_count, 4.0);
    }

    #[test]
    fn test_raw_samples_capped() {
        let samples: Vec<_> = (0..5).map(|m| sample_at(t0() + Duration::minutes(m)).gear(1).build()).collect();
        let mut config = AnalyticsConfig::default();
        config.raw_sample_limit = 3;
        let base = service_with(&samples);
        let service = AnalyticsService { config, ..base };

        let raw = service.raw_samples(GearId(1), 100).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0].created_at, t0() + Duration::minutes(4));
    }
}
