//! DALI Monitor: DALI-2 lighting telemetry collection and analytics
//!
//! Gateways broadcast fixed-layout binary frames over UDP. The monitor
//! decodes them, resolves the reporting gear against the inventory,
//! appends the result to a sample store and serves analytics over HTTP.
//!
//! ## Architecture
//!
//! - **Acquisition**: frame validation, bit-field decoding, UDP socket setup
//! - **Pipeline**: frame sources and the concurrent ingestion loop
//! - **Registry**: read-only gear inventory lookups
//! - **Storage**: append-only sample store (sled or in-memory)
//! - **Analytics**: daily / hourly / weekday views, fault events, live status
//! - **API**: read-only JSON endpoints

pub mod acquisition;
pub mod analytics;
pub mod api;
pub mod config;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    AggregateBucket, ErrorPoint, FaultCounter, FaultMaximum, GearId, GearKey, GroupAnalysis,
    HistoryStep, Sample, StatusSnapshot, TelemetryRecord,
};

// Re-export decoding
pub use acquisition::{decode_frame, DecodeError, FrameBuilder};

// Re-export services
pub use analytics::{AnalyticsError, AnalyticsService, Calendar};
pub use pipeline::{IngestError, IngestPipeline, ProcessingLoop};
pub use registry::{GearRegistry, RegistryError, StaticRegistry};
pub use storage::{InMemorySampleStore, PersistenceError, SampleStore, SledSampleStore};
