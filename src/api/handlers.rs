//! API route handlers
//!
//! One in-memory session per server: uploaded sources, their sheet choices,
//! and the latest pipeline run. Any change to the sources discards the run.
//! Parsing, pipeline runs and rendering happen on the blocking pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::acquisition::{load_bytes, RawSource, SourceKind};
use crate::config::CbmConfig;
use crate::pipeline::{self, DatasetSummary, PipelineRun, SourceInput};
use crate::report::{self, ChartSpec, Signal};
use crate::types::{Axis, ThresholdSet};

// ============================================================================
// Session State
// ============================================================================

/// A source held by the session.
#[derive(Debug, Clone)]
pub struct UploadedSource {
    pub name: String,
    pub source: Arc<RawSource>,
    pub sheet: Option<String>,
}

#[derive(Debug, Default)]
pub struct Session {
    pub sources: Vec<UploadedSource>,
    pub run: Option<Arc<PipelineRun>>,
    /// Bumped on every source change so a stale run is never stored
    pub generation: u64,
}

impl Session {
    fn invalidate(&mut self) {
        self.run = None;
        self.generation += 1;
    }
}

/// Shared state for API handlers
#[derive(Clone)]
pub struct SessionState {
    pub config: Arc<CbmConfig>,
    pub session: Arc<RwLock<Session>>,
}

impl SessionState {
    pub fn new(config: CbmConfig) -> Self {
        Self {
            config: Arc::new(config),
            session: Arc::new(RwLock::new(Session::default())),
        }
    }
}

/// Latest run, or a 404 envelope.
async fn current_run(state: &SessionState) -> Result<Arc<PipelineRun>, Response> {
    state
        .session
        .read()
        .await
        .run
        .clone()
        .ok_or_else(|| ApiErrorResponse::not_found("No pipeline run available; POST /api/v1/runs first"))
}

async fn blocking<T, F>(task: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiErrorResponse::internal(format!("Background task failed: {e}")))
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub sources: usize,
    pub has_run: bool,
}

/// GET /health
pub async fn health(State(state): State<SessionState>) -> Response {
    let session = state.session.read().await;
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sources: session.sources.len(),
        has_run: session.run.is_some(),
    })
}

// ============================================================================
// Sources
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: SourceKind,
    pub sheets: Vec<String>,
    pub selected_sheet: Option<String>,
    /// True while a workbook still needs a sheet choice before a run
    pub needs_selection: bool,
}

impl From<&UploadedSource> for SourceInfo {
    fn from(s: &UploadedSource) -> Self {
        Self {
            name: s.name.clone(),
            kind: s.source.kind(),
            sheets: s.source.sheet_names(),
            selected_sheet: s.sheet.clone(),
            needs_selection: s.sheet.is_none() && s.source.needs_selection(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

/// POST /api/v1/sources?name=<file>
///
/// Body is the raw file. Re-uploading a name replaces that source.
pub async fn upload_source(
    State(state): State<SessionState>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    let name = q.name.trim().to_string();
    if name.is_empty() {
        return ApiErrorResponse::bad_request("Query parameter 'name' must not be empty");
    }
    if body.is_empty() {
        return ApiErrorResponse::bad_request("Request body is empty");
    }
    let Some(delimiter) = state.config.input.delimiter_byte() else {
        return ApiErrorResponse::internal("Configured CSV delimiter is invalid");
    };

    let parse_name = name.clone();
    let parsed = match blocking(move || load_bytes(&parse_name, body.to_vec(), delimiter)).await {
        Ok(parsed) => parsed,
        Err(resp) => return resp,
    };
    let source = match parsed {
        Ok(source) => source,
        Err(e) => {
            warn!(source = %name, error = %e, "Upload rejected");
            return ApiErrorResponse::bad_request(format!("Could not read '{name}': {e}"));
        }
    };

    let uploaded = UploadedSource {
        name: name.clone(),
        source: Arc::new(source),
        sheet: None,
    };
    let info = SourceInfo::from(&uploaded);

    let mut session = state.session.write().await;
    match session.sources.iter_mut().find(|s| s.name == name) {
        Some(existing) => *existing = uploaded,
        None => session.sources.push(uploaded),
    }
    session.invalidate();
    info!(source = %name, kind = ?info.kind, sheets = info.sheets.len(), "Source uploaded");

    ApiResponse::created(info)
}

/// GET /api/v1/sources
pub async fn list_sources(State(state): State<SessionState>) -> Response {
    let session = state.session.read().await;
    let list: Vec<SourceInfo> = session.sources.iter().map(SourceInfo::from).collect();
    ApiResponse::ok(list)
}

#[derive(Debug, Deserialize)]
pub struct SheetSelection {
    pub sheet: String,
}

/// PUT /api/v1/sources/:name/sheet
pub async fn select_sheet(
    State(state): State<SessionState>,
    Path(name): Path<String>,
    Json(body): Json<SheetSelection>,
) -> Response {
    let mut session = state.session.write().await;
    let Some(entry) = session.sources.iter_mut().find(|s| s.name == name) else {
        return ApiErrorResponse::not_found(format!("No source named '{name}'"));
    };
    if entry.source.kind() == SourceKind::Flat {
        return ApiErrorResponse::bad_request(format!("'{name}' is a flat table and has no sheets"));
    }
    if let Err(e) = entry.source.resolve(Some(body.sheet.as_str())) {
        return ApiErrorResponse::bad_request(format!("'{name}': {e}"));
    }
    entry.sheet = Some(body.sheet.clone());
    let info = SourceInfo::from(&*entry);
    session.invalidate();
    info!(source = %name, sheet = %body.sheet, "Sheet selected");
    ApiResponse::ok(info)
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// DELETE /api/v1/sources
pub async fn clear_sources(State(state): State<SessionState>) -> Response {
    let mut session = state.session.write().await;
    let cleared = session.sources.len();
    session.sources.clear();
    session.invalidate();
    info!(cleared, "Session cleared");
    ApiResponse::ok(ClearResponse { cleared })
}

// ============================================================================
// Runs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub summary: DatasetSummary,
    pub thresholds: ThresholdSet,
}

/// POST /api/v1/runs
pub async fn create_run(State(state): State<SessionState>) -> Response {
    let (sources, generation) = {
        let session = state.session.read().await;
        (session.sources.clone(), session.generation)
    };
    let normalizer = state.config.normalizer.clone();

    let result = match blocking(move || {
        let inputs: Vec<SourceInput<'_>> = sources
            .iter()
            .map(|s| SourceInput::new(&s.name, &s.source).with_sheet(s.sheet.as_deref()))
            .collect();
        pipeline::compute(&inputs, &normalizer)
    })
    .await
    {
        Ok(result) => result,
        Err(resp) => return resp,
    };

    let run = match result {
        Ok(run) => Arc::new(run),
        Err(e) => {
            warn!(error = %e, "Pipeline run failed");
            return ApiErrorResponse::from_pipeline(&e);
        }
    };

    let mut session = state.session.write().await;
    if session.generation != generation {
        return ApiErrorResponse::conflict(
            "SOURCES_CHANGED",
            "Sources changed while the run was in progress; run again",
            None,
        );
    }
    session.run = Some(Arc::clone(&run));

    ApiResponse::created(RunResponse {
        summary: run.summary.clone(),
        thresholds: run.thresholds,
    })
}

/// GET /api/v1/summary
pub async fn get_summary(State(state): State<SessionState>) -> Response {
    match current_run(&state).await {
        Ok(run) => ApiResponse::ok(&run.summary),
        Err(resp) => resp,
    }
}

/// GET /api/v1/thresholds
pub async fn get_thresholds(State(state): State<SessionState>) -> Response {
    match current_run(&state).await {
        Ok(run) => ApiResponse::ok(run.thresholds),
        Err(resp) => resp,
    }
}

#[derive(Debug, Deserialize)]
pub struct DiagnosisQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosisRow {
    pub time: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_rms: f64,
    pub y_rms: f64,
    pub z_rms: f64,
    pub diagnosis: String,
    pub severity: String,
}

/// GET /api/v1/diagnosis?limit=N — most recent rows, oldest first
pub async fn get_diagnosis(
    State(state): State<SessionState>,
    Query(q): Query<DiagnosisQuery>,
) -> Response {
    let run = match current_run(&state).await {
        Ok(run) => run,
        Err(resp) => return resp,
    };
    let limit = q.limit.unwrap_or(state.config.report.recent_rows);
    let rows: Vec<DiagnosisRow> = run
        .recent(limit)
        .iter()
        .map(|d| DiagnosisRow {
            time: d.sample.timestamp.format(report::REPORT_TIME_FORMAT).to_string(),
            x: d.sample.x,
            y: d.sample.y,
            z: d.sample.z,
            x_rms: d.rms.x,
            y_rms: d.rms.y,
            z_rms: d.rms.z,
            diagnosis: d.diagnosis.to_string(),
            severity: d.severity.to_string(),
        })
        .collect();
    ApiResponse::ok(rows)
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    #[serde(default)]
    pub axis: Option<Axis>,
    #[serde(default)]
    pub signal: Option<Signal>,
}

fn chart_spec(config: &CbmConfig, q: &ChartQuery) -> ChartSpec {
    let spec = ChartSpec::from_config(&config.chart);
    let spec = q.axis.map_or(spec, |a| spec.with_axis(a));
    q.signal.map_or(spec, |s| spec.with_signal(s))
}

/// GET /api/v1/chart?axis=x&signal=raw — SVG document
pub async fn get_chart(
    State(state): State<SessionState>,
    Query(q): Query<ChartQuery>,
) -> Response {
    let run = match current_run(&state).await {
        Ok(run) => run,
        Err(resp) => return resp,
    };
    let spec = chart_spec(&state.config, &q);
    match blocking(move || report::render_svg(&run, &spec)).await {
        Ok(Ok(svg)) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Ok(Err(e)) => ApiErrorResponse::internal(e.to_string()),
        Err(resp) => resp,
    }
}

/// GET /api/v1/report — printable HTML
pub async fn get_report(
    State(state): State<SessionState>,
    Query(q): Query<ChartQuery>,
) -> Response {
    let run = match current_run(&state).await {
        Ok(run) => run,
        Err(resp) => return resp,
    };
    let spec = chart_spec(&state.config, &q);
    let config = Arc::clone(&state.config);
    match blocking(move || report::render_report(&run, &config, &spec)).await {
        Ok(Ok(html)) => ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response(),
        Ok(Err(report::ReportError::EmptyRun)) => ApiErrorResponse::not_found("Run has no diagnosed rows"),
        Ok(Err(e)) => ApiErrorResponse::internal(e.to_string()),
        Err(resp) => resp,
    }
}

/// GET /api/v1/export — diagnosed rows as CSV
pub async fn get_export(State(state): State<SessionState>) -> Response {
    let run = match current_run(&state).await {
        Ok(run) => run,
        Err(resp) => return resp,
    };
    match blocking(move || report::diagnosed_csv_bytes(&run)).await {
        Ok(Ok(bytes)) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"diagnosed.csv\""),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => ApiErrorResponse::internal(format!("CSV export failed: {e}")),
        Err(resp) => resp,
    }
}
