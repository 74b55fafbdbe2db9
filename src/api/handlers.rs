//! API route handlers
//!
//! Analytics handlers run the store-backed service on the blocking pool and
//! wrap the result in the response envelope. Query-string problems are
//! reported as `BAD_REQUEST` envelopes rather than axum's plain-text
//! rejections.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::envelope::Envelope;
use crate::analytics::{AnalyticsError, AnalyticsService, Calendar};
use crate::pipeline::IngestStats;
use crate::storage::SampleStore;
use crate::types::GearId;

/// Default number of samples returned by `/api/energy-raw` and `/api/energy`.
pub const DEFAULT_RAW_LIMIT: usize = 100;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub analytics: AnalyticsService,
    /// Stamps responses with the site offset
    pub envelope: Envelope,
    /// Store handle for health reporting
    pub store: Arc<dyn SampleStore>,
    /// Counters of the running ingestion pipeline
    pub ingest_stats: Arc<IngestStats>,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(
        analytics: AnalyticsService,
        calendar: Calendar,
        store: Arc<dyn SampleStore>,
        ingest_stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            analytics,
            envelope: Envelope::new(calendar),
            store,
            ingest_stats,
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn analytics_error(envelope: Envelope, e: &AnalyticsError) -> Response {
    match e {
        AnalyticsError::InvalidStep(msg) => envelope.bad_request(msg.clone()),
        other => {
            tracing::error!(error = %other, "Analytics query failed");
            envelope.internal(other.to_string())
        }
    }
}

/// Run a blocking analytics call and wrap its outcome.
async fn run_analytics<T, F>(envelope: Envelope, f: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<T, AnalyticsError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(data)) => envelope.ok(data),
        Ok(Err(e)) => analytics_error(envelope, &e),
        Err(e) => {
            tracing::error!(error = %e, "Analytics task panicked");
            envelope.internal("analytics task failed")
        }
    }
}

fn bad_query(envelope: Envelope, rejection: &QueryRejection) -> Response {
    envelope.bad_request(rejection.body_text())
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub config_id: u32,
    pub step: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfigParams {
    pub config_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct GroupRangeParams {
    pub config_id: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct GearRangeParams {
    pub gear_id: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PointParams {
    pub gear_id: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RawParams {
    pub gear_id: u64,
    pub limit: Option<usize>,
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub storage_backend: &'static str,
    pub stored_samples: Option<usize>,
}

/// GET /health
pub async fn get_health(State(state): State<ApiState>) -> Response {
    let store = Arc::clone(&state.store);
    let stored_samples = tokio::task::spawn_blocking(move || store.count().ok())
        .await
        .ok()
        .flatten();
    state.envelope.ok(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        storage_backend: state.store.backend_name(),
        stored_samples,
    })
}

/// GET /api/ingest/stats
pub async fn get_ingest_stats(State(state): State<ApiState>) -> Response {
    state.envelope.ok(state.ingest_stats.snapshot())
}

/// GET /api/history?config_id=15&step=minute|hour
pub async fn get_history(
    State(state): State<ApiState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    let step = match AnalyticsService::parse_step(&q.step) {
        Ok(step) => step,
        Err(e) => return analytics_error(state.envelope, &e),
    };
    run_analytics(state.envelope, move || state.analytics.history(q.config_id, step)).await
}

/// GET /api/analysis?config_id=15&start=…&end=…
pub async fn get_analysis(
    State(state): State<ApiState>,
    params: Result<Query<GroupRangeParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    if q.start >= q.end {
        return state.envelope.bad_request("start must be before end");
    }
    run_analytics(state.envelope, move || {
        state.analytics.analysis(q.config_id, q.start, q.end)
    })
    .await
}

/// GET /api/errors/light-search?gear_id=7&start=…&end=…
pub async fn get_error_points(
    State(state): State<ApiState>,
    params: Result<Query<GearRangeParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    run_analytics(state.envelope, move || {
        state.analytics.error_points(GearId(q.gear_id), q.start, q.end)
    })
    .await
}

/// GET /api/errors/point-data?gear_id=7&created_at=…
pub async fn get_error_point_context(
    State(state): State<ApiState>,
    params: Result<Query<PointParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    run_analytics(state.envelope, move || {
        state.analytics.error_point_context(GearId(q.gear_id), q.created_at)
    })
    .await
}

/// GET /api/errors/light-max-2-month?config_id=15
pub async fn get_max_faults(
    State(state): State<ApiState>,
    params: Result<Query<ConfigParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    run_analytics(state.envelope, move || state.analytics.max_faults(q.config_id)).await
}

/// GET /api/region-status?config_id=15
pub async fn get_region_status(
    State(state): State<ApiState>,
    params: Result<Query<ConfigParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    run_analytics(state.envelope, move || state.analytics.status(q.config_id)).await
}

/// GET /api/energy-raw?gear_id=7&limit=100
pub async fn get_raw_samples(
    State(state): State<ApiState>,
    params: Result<Query<RawParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    let limit = q.limit.unwrap_or(DEFAULT_RAW_LIMIT);
    run_analytics(state.envelope, move || {
        state.analytics.raw_samples(GearId(q.gear_id), limit)
    })
    .await
}

/// GET /api/energy?gear_id=7&limit=100
///
/// Same rows as `/api/energy-raw`, as `{keys, values}` columns.
pub async fn get_raw_columns(
    State(state): State<ApiState>,
    params: Result<Query<RawParams>, QueryRejection>,
) -> Response {
    let Query(q) = match params {
        Ok(q) => q,
        Err(e) => return bad_query(state.envelope, &e),
    };
    let limit = q.limit.unwrap_or(DEFAULT_RAW_LIMIT);
    run_analytics(state.envelope, move || {
        state.analytics.raw_columns(GearId(q.gear_id), limit)
    })
    .await
}
