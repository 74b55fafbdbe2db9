//! SampleStore trait and the in-memory backend

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::types::{GearId, Sample};

/// Time ordering of query results. Results are always grouped by gear id
/// (ascending) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOrder {
    #[default]
    Ascending,
    Descending,
}

/// Samples of a set of gears captured in `[from, to)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuery {
    pub gear_ids: Vec<GearId>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub order: TimeOrder,
    /// Cap on the total number of samples returned
    pub limit: Option<usize>,
}

impl SampleQuery {
    pub fn new(gear_ids: Vec<GearId>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            gear_ids,
            from,
            to,
            order: TimeOrder::Ascending,
            limit: None,
        }
    }

    pub fn descending(mut self) -> Self {
        self.order = TimeOrder::Descending;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Gear ids sorted and deduplicated, the order results are grouped in.
    pub(crate) fn sorted_gears(&self) -> Vec<GearId> {
        let mut ids = self.gear_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub(crate) fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

/// Pluggable sample persistence.
///
/// Implementations must be thread-safe (Send + Sync); blocking ingest tasks
/// append while API handlers query.
pub trait SampleStore: Send + Sync {
    /// Persist one sample. Samples sharing a gear and timestamp are all kept.
    fn append(&self, sample: &Sample) -> Result<(), PersistenceError>;

    /// Samples matching `query`, grouped by gear then ordered by time.
    fn query(&self, query: &SampleQuery) -> Result<Vec<Sample>, PersistenceError>;

    /// Total number of stored samples
    fn count(&self) -> Result<usize, PersistenceError>;

    /// Make appended samples durable. No-op for volatile backends.
    fn flush(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory sample store.
///
/// Thread-safe via `RwLock`. Not durable: data is lost on restart.
#[derive(Default)]
pub struct InMemorySampleStore {
    /// Per-gear samples, kept sorted by capture time (insertion order on ties)
    samples: RwLock<BTreeMap<GearId, Vec<Sample>>>,
}

impl InMemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleStore for InMemorySampleStore {
    fn append(&self, sample: &Sample) -> Result<(), PersistenceError> {
        let mut store = self
            .samples
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        let series = store.entry(sample.gear_id).or_default();
        let at = series.partition_point(|s| s.created_at <= sample.created_at);
        series.insert(at, sample.clone());
        Ok(())
    }

    fn query(&self, query: &SampleQuery) -> Result<Vec<Sample>, PersistenceError> {
        let store = self
            .samples
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        let limit = query.limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();

        for gear_id in query.sorted_gears() {
            let Some(series) = store.get(&gear_id) else {
                continue;
            };
            let in_range = series.iter().filter(|s| query.contains(s.created_at));
            let remaining = limit - out.len();
            match query.order {
                TimeOrder::Ascending => out.extend(in_range.take(remaining).cloned()),
                TimeOrder::Descending => out.extend(in_range.rev().take(remaining).cloned()),
            }
            if out.len() >= limit {
                break;
            }
        }

        Ok(out)
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        let store = self
            .samples
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        Ok(store.values().map(Vec::len).sum())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
