//! Per-frame ingestion: decode, resolve, stamp, persist

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::acquisition::{decode_frame, DecodeError};
use crate::registry::{GearRegistry, RegistryError};
use crate::storage::{PersistenceError, SampleStore};
use crate::types::{GearKey, Sample};

/// Reasons a single frame was not stored. None of them stop the listener.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("gear {0} is not registered")]
    GearNotFound(GearKey),
    #[error("registry lookup failed: {0}")]
    Registry(#[from] RegistryError),
    #[error("persist failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Lock-free ingest counters shared between blocking tasks and the API.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    stored: AtomicU64,
    invalid: AtomicU64,
    unknown_gear: AtomicU64,
    registry_failures: AtomicU64,
    persistence_failures: AtomicU64,
    source_errors: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStatsSnapshot {
    pub received: u64,
    pub stored: u64,
    pub invalid: u64,
    pub unknown_gear: u64,
    pub registry_failures: u64,
    pub persistence_failures: u64,
    /// Receive errors reported by the frame source itself.
    pub source_errors: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            unknown_gear: self.unknown_gear.load(Ordering::Relaxed),
            registry_failures: self.registry_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
        }
    }

    /// Count a receive error that produced no frame.
    pub fn record_source_error(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, outcome: &Result<Sample, IngestError>) {
        let counter = match outcome {
            Ok(_) => &self.stored,
            Err(IngestError::Decode(_)) => &self.invalid,
            Err(IngestError::GearNotFound(_)) => &self.unknown_gear,
            Err(IngestError::Registry(_)) => &self.registry_failures,
            Err(IngestError::Persistence(_)) => &self.persistence_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decode → resolve → persist, shared by every frame source.
///
/// Cheap to clone; all state sits behind `Arc`s.
#[derive(Clone)]
pub struct IngestPipeline {
    registry: Arc<dyn GearRegistry>,
    store: Arc<dyn SampleStore>,
    stats: Arc<IngestStats>,
}

impl IngestPipeline {
    pub fn new(registry: Arc<dyn GearRegistry>, store: Arc<dyn SampleStore>) -> Self {
        Self {
            registry,
            store,
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Ingest one frame captured at `received_at`.
    ///
    /// Blocking: call from `spawn_blocking` when running on the runtime.
    pub fn ingest(&self, frame: &[u8], received_at: DateTime<Utc>) -> Result<Sample, IngestError> {
        let record = decode_frame(frame)?;
        let key = GearKey::of(&record);
        let gear_id = self
            .registry
            .resolve(&key)?
            .ok_or(IngestError::GearNotFound(key))?;

        let sample = Sample::new(gear_id, received_at, record);
        self.store.append(&sample)?;
        Ok(sample)
    }

    /// [`ingest`](Self::ingest), then count and log the outcome.
    pub fn process(&self, frame: &[u8], received_at: DateTime<Utc>) -> Option<Sample> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        let outcome = self.ingest(frame, received_at);
        self.stats.record(&outcome);

        match outcome {
            Ok(sample) => {
                debug!(gear_id = %sample.gear_id, serial = %sample.record.serial, "Sample stored");
                Some(sample)
            }
            Err(e @ (IngestError::Decode(_) | IngestError::GearNotFound(_))) => {
                warn!(len = frame.len(), error = %e, "Frame dropped");
                None
            }
            Err(e) => {
                error!(error = %e, "Frame dropped");
                None
            }
        }
    }
}
