//! Ingestion pipeline
//!
//! ```text
//! FrameSource (UDP | replay)
//!     → ProcessingLoop (one blocking task per frame)
//!         → decode_frame → GearRegistry::resolve → SampleStore::append
//! ```

pub mod ingest;
pub mod processing_loop;
pub mod source;

pub use ingest::{IngestError, IngestPipeline, IngestStats, IngestStatsSnapshot};
pub use processing_loop::ProcessingLoop;
pub use source::{FrameEvent, FrameSource, ReplaySource, UdpSource};
