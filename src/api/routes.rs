//! API route definitions
//!
//! - /api/v1/sources            - upload, list and clear input files
//! - /api/v1/sources/:name/sheet - choose a workbook sheet
//! - /api/v1/runs               - run the pipeline over the current sources
//! - /api/v1/summary, /thresholds, /diagnosis - results of the latest run
//! - /api/v1/chart, /report, /export - rendered documents

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;

use super::handlers::{self, SessionState};

/// Create all versioned API routes
pub fn api_routes(state: SessionState) -> Router {
    Router::new()
        .route(
            "/sources",
            post(handlers::upload_source)
                .get(handlers::list_sources)
                .delete(handlers::clear_sources),
        )
        .route("/sources/:name/sheet", put(handlers::select_sheet))
        // One run at a time; later requests queue behind it
        .route(
            "/runs",
            post(handlers::create_run).layer(ConcurrencyLimitLayer::new(1)),
        )
        .route("/summary", get(handlers::get_summary))
        .route("/thresholds", get(handlers::get_thresholds))
        .route("/diagnosis", get(handlers::get_diagnosis))
        .route("/chart", get(handlers::get_chart))
        .route("/report", get(handlers::get_report))
        .route("/export", get(handlers::get_export))
        .with_state(state)
}

/// Unversioned health endpoint at root level
pub fn health_routes(state: SessionState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
}
