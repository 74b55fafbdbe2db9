//! Frame processing loop shared by the UDP listener and replay mode.
//!
//! Receives frames sequentially and hands each one to a blocking task
//! running [`IngestPipeline::process`], so the receive side never waits on
//! persistence.

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::ingest::{IngestPipeline, IngestStatsSnapshot};
use crate::config::defaults::MAX_CONSECUTIVE_SOURCE_ERRORS;
use super::source::{FrameEvent, FrameSource};

/// Owns the pipeline and cancellation token for one frame source.
pub struct ProcessingLoop {
    pipeline: IngestPipeline,
    cancel_token: CancellationToken,
}

impl ProcessingLoop {
    pub fn new(pipeline: IngestPipeline, cancel_token: CancellationToken) -> Self {
        Self {
            pipeline,
            cancel_token,
        }
    }

    /// Run until the source is exhausted or cancellation.
    ///
    /// A receive error is logged, counted and skipped. In-flight frames are
    /// allowed to finish before returning. Returns the pipeline's counters
    /// at exit, or `Err` once the source has failed
    /// [`MAX_CONSECUTIVE_SOURCE_ERRORS`] times in a row.
    pub async fn run<S: FrameSource>(self, source: &mut S) -> Result<IngestStatsSnapshot> {
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut consecutive_errors: u32 = 0;
        let mut source_failed = false;

        info!(source = source.source_name(), "Processing telemetry frames");

        loop {
            let event = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(source = source.source_name(), "Shutdown signal received");
                    break;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Ingest task failed");
                    }
                    continue;
                }
                result = source.next_frame() => {
                    match result {
                        Ok(ev) => {
                            consecutive_errors = 0;
                            ev
                        }
                        Err(e) => {
                            self.pipeline.stats().record_source_error();
                            consecutive_errors += 1;
                            warn!(
                                source = source.source_name(),
                                consecutive = consecutive_errors,
                                error = %e,
                                "Source error"
                            );
                            if consecutive_errors >= MAX_CONSECUTIVE_SOURCE_ERRORS {
                                source_failed = true;
                                break;
                            }
                            continue;
                        }
                    }
                }
            };

            match event {
                FrameEvent::Frame(bytes, peer) => {
                    let received_at = Utc::now();
                    if let Some(peer) = peer {
                        tracing::trace!(peer = %peer, len = bytes.len(), "Datagram received");
                    }
                    let pipeline = self.pipeline.clone();
                    in_flight.spawn_blocking(move || {
                        pipeline.process(&bytes, received_at);
                    });
                }
                FrameEvent::Eof => {
                    info!(source = source.source_name(), "Source reached end");
                    break;
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Ingest task failed");
            }
        }

        let stats = self.pipeline.stats().snapshot();
        info!(
            received = stats.received,
            stored = stats.stored,
            invalid = stats.invalid,
            unknown_gear = stats.unknown_gear,
            source_errors = stats.source_errors,
            "Processing loop stopped"
        );

        if source_failed {
            bail!(
                "{} source failed {} times in a row",
                source.source_name(),
                MAX_CONSECUTIVE_SOURCE_ERRORS
            );
        }
        Ok(stats)
    }
}
