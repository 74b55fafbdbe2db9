//! API route definitions
//!
//! - /api/history - recent samples per gear (minute or hour step)
//! - /api/analysis - daily / hour-of-day / weekday views of a group
//! - /api/errors/* - fault events, their context, per-gear maxima
//! - /api/region-status - live status since local midnight
//! - /api/energy-raw - newest raw samples of one gear
//! - /api/energy - the same samples as `{keys, values}` columns
//! - /api/ingest/stats - ingestion counters

use axum::{routing::get, Router};

use super::handlers::{self, ApiState};

/// Create all `/api` routes.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/history", get(handlers::get_history))
        .route("/analysis", get(handlers::get_analysis))
        .route("/errors/light-search", get(handlers::get_error_points))
        .route("/errors/point-data", get(handlers::get_error_point_context))
        .route("/errors/light-max-2-month", get(handlers::get_max_faults))
        .route("/region-status", get(handlers::get_region_status))
        .route("/energy-raw", get(handlers::get_raw_samples))
        .route("/energy", get(handlers::get_raw_columns))
        .route("/ingest/stats", get(handlers::get_ingest_stats))
        .with_state(state)
}

/// Unversioned health endpoint at /health.
pub fn health_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state)
}
