//! Sled-backed sample store
//!
//! Key layout (all big-endian, so byte order matches query order):
//!
//! ```text
//! gear_id (8) | created_at millis, sign bit flipped (8) | sled id (8)
//! ```
//!
//! The trailing id keeps samples that share a millisecond distinct.
//! Values are JSON-serialized [`Sample`]s.

use chrono::{DateTime, Utc};
use sled::Tree;
use std::path::Path;
use tracing::warn;

use super::persistence::{PersistenceError, SampleQuery, SampleStore, TimeOrder};
use crate::types::{GearId, Sample};

const SAMPLES_TREE: &str = "samples";
const KEY_LEN: usize = 24;

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        PersistenceError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

/// Durable sample store on an embedded sled database.
#[derive(Clone)]
pub struct SledSampleStore {
    db: sled::Db,
    samples: Tree,
}

impl SledSampleStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let db = sled::open(path)?;
        let samples = db.open_tree(SAMPLES_TREE)?;
        Ok(Self { db, samples })
    }

    fn scan_gear(
        &self,
        gear_id: GearId,
        query: &SampleQuery,
        remaining: usize,
        out: &mut Vec<Sample>,
    ) -> Result<(), PersistenceError> {
        let start = time_prefix(gear_id, query.from);
        let end = time_prefix(gear_id, query.to);
        let range = self.samples.range(start..end);

        let iter: Box<dyn Iterator<Item = sled::Result<(sled::IVec, sled::IVec)>>> = match query.order {
            TimeOrder::Ascending => Box::new(range),
            TimeOrder::Descending => Box::new(range.rev()),
        };

        let mut taken = 0;
        for item in iter {
            if taken >= remaining {
                break;
            }
            let (key, value) = item?;
            match serde_json::from_slice::<Sample>(&value) {
                Ok(sample) => {
                    out.push(sample);
                    taken += 1;
                }
                Err(e) => warn!(key = ?key, error = %e, "Skipping undecodable sample"),
            }
        }
        Ok(())
    }
}

/// Millisecond timestamp mapped onto u64 so that byte order matches time order.
fn encode_millis(at: DateTime<Utc>) -> [u8; 8] {
    ((at.timestamp_millis() as u64) ^ (1 << 63)).to_be_bytes()
}

fn time_prefix(gear_id: GearId, at: DateTime<Utc>) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&gear_id.0.to_be_bytes());
    key[8..].copy_from_slice(&encode_millis(at));
    key
}

fn sample_key(sample: &Sample, id: u64) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    key[..16].copy_from_slice(&time_prefix(sample.gear_id, sample.created_at));
    key[16..].copy_from_slice(&id.to_be_bytes());
    key
}

impl SampleStore for SledSampleStore {
    fn append(&self, sample: &Sample) -> Result<(), PersistenceError> {
        let id = self.db.generate_id()?;
        let value = serde_json::to_vec(sample)?;
        // No flush per write; sled flushes in the background.
        self.samples.insert(sample_key(sample, id), value)?;
        Ok(())
    }

    fn query(&self, query: &SampleQuery) -> Result<Vec<Sample>, PersistenceError> {
        let limit = query.limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        if query.from >= query.to {
            return Ok(out);
        }
        for gear_id in query.sorted_gears() {
            if out.len() >= limit {
                break;
            }
            let remaining = limit - out.len();
            self.scan_gear(gear_id, query, remaining, &mut out)?;
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.samples.len())
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemetryRecord;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn sample(gear: u64, minutes: i64, on_time: u32) -> Sample {
        let record = TelemetryRecord {
            light_source_on_time: on_time,
            control_gear_voltage: 230.1,
            ..TelemetryRecord::default()
        };
        Sample::new(GearId(gear), at(minutes), record)
    }

    #[test]
    fn test_append_and_query_round_trip() {
        let dir = tempdir().unwrap();
        let store = SledSampleStore::open(dir.path().join("samples.db")).unwrap();
        let original = sample(4, 15, 1200);
        store.append(&original).unwrap();

        let got = store
            .query(&SampleQuery::new(vec![GearId(4)], at(0), at(60)))
            .unwrap();
        assert_eq!(got, vec![original]);
    }

    #[test]
    fn test_query_order_and_gear_isolation() {
        let dir = tempdir().unwrap();
        let store = SledSampleStore::open(dir.path().join("samples.db")).unwrap();
        for (gear, minute) in [(1, 30), (2, 5), (1, 10), (1, 20), (3, 15)] {
            store.append(&sample(gear, minute, minute as u32)).unwrap();
        }

        let asc = store
            .query(&SampleQuery::new(vec![GearId(1)], at(0), at(60)))
            .unwrap();
        let minutes: Vec<_> = asc.iter().map(|s| s.record.light_source_on_time).collect();
        assert_eq!(minutes, vec![10, 20, 30]);

        let desc = store
            .query(&SampleQuery::new(vec![GearId(1), GearId(2)], at(0), at(60)).descending())
            .unwrap();
        let pairs: Vec<_> = desc
            .iter()
            .map(|s| (s.gear_id.0, s.record.light_source_on_time))
            .collect();
        assert_eq!(pairs, vec![(1, 30), (1, 20), (1, 10), (2, 5)]);
    }

    #[test]
    fn test_range_end_is_exclusive() {
        let dir = tempdir().unwrap();
        let store = SledSampleStore::open(dir.path().join("samples.db")).unwrap();
        store.append(&sample(1, 0, 0)).unwrap();
        store.append(&sample(1, 60, 60)).unwrap();

        let got = store
            .query(&SampleQuery::new(vec![GearId(1)], at(0), at(60)))
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].record.light_source_on_time, 0);
    }

    #[test]
    fn test_limit_spans_gears() {
        let dir = tempdir().unwrap();
        let store = SledSampleStore::open(dir.path().join("samples.db")).unwrap();
        for minute in 0..5 {
            store.append(&sample(1, minute, 0)).unwrap();
            store.append(&sample(2, minute, 0)).unwrap();
        }
        let got = store
            .query(&SampleQuery::new(vec![GearId(1), GearId(2)], at(0), at(60)).with_limit(7))
            .unwrap();
        assert_eq!(got.len(), 7);
        assert_eq!(got.iter().filter(|s| s.gear_id == GearId(2)).count(), 2);
    }

    #[test]
    fn test_same_millisecond_samples_are_kept() {
        let dir = tempdir().unwrap();
        let store = SledSampleStore::open(dir.path().join("samples.db")).unwrap();
        store.append(&sample(1, 0, 1)).unwrap();
        store.append(&sample(1, 0, 2)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_pre_epoch_timestamps_sort_first() {
        let before = Utc.with_ymd_and_hms(1969, 12, 31, 23, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(1970, 1, 1, 1, 0, 0).unwrap();
        assert!(encode_millis(before) < encode_millis(after));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.db");
        {
            let store = SledSampleStore::open(&path).unwrap();
            store.append(&sample(1, 0, 7)).unwrap();
            store.flush().unwrap();
        }
        let store = SledSampleStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
