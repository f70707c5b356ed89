//! Report rendering
//!
//! Builds the presentation artefacts of a run:
//! - [`chart`]: SVG time-series chart with threshold lines
//! - [`html`]: printable, paginated HTML report
//! - [`export`]: diagnosed rows as CSV
//!
//! [`ReportDocument`] gathers everything the report shows so the layout code
//! only formats strings.

pub mod chart;
pub mod export;
pub mod html;

pub use chart::{render_svg, ChartError, ChartSpec, Signal};
pub use export::{diagnosed_csv_bytes, write_diagnosed_csv};

use serde::Serialize;

use crate::config::CbmConfig;
use crate::pipeline::{PipelineRun, SkipNotice};
use crate::processing::AxisStats;
use crate::types::{rule_text, Axis, AxisThreshold};

/// Time format of the recent-rows table
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no diagnosed data: run the pipeline first")]
    EmptyRun,

    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// One line of the recent-rows table, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub time: String,
    pub x_rms: String,
    pub y_rms: String,
    pub z_rms: String,
    pub diagnosis: String,
}

/// Everything the report shows.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: String,
    pub rows: usize,
    pub coverage: Option<String>,
    pub axis_stats: Vec<AxisStats>,
    pub skipped: Vec<SkipNotice>,
    pub rules: Vec<String>,
    pub thresholds: Vec<(Axis, AxisThreshold)>,
    pub chart_svg: String,
    pub recent: Vec<ReportRow>,
}

impl ReportDocument {
    pub fn build(
        run: &PipelineRun,
        title: &str,
        recent_rows: usize,
        chart_svg: String,
    ) -> Result<Self, ReportError> {
        if run.diagnosed.is_empty() {
            return Err(ReportError::EmptyRun);
        }
        let recent = run
            .recent(recent_rows)
            .iter()
            .map(|d| ReportRow {
                time: d.sample.timestamp.format(REPORT_TIME_FORMAT).to_string(),
                x_rms: format!("{:.3}", d.rms.x),
                y_rms: format!("{:.3}", d.rms.y),
                z_rms: format!("{:.3}", d.rms.z),
                diagnosis: d.diagnosis.to_string(),
            })
            .collect();

        Ok(Self {
            title: title.to_string(),
            generated_at: chrono::Utc::now().format(REPORT_TIME_FORMAT).to_string(),
            rows: run.summary.rows,
            coverage: run.summary.coverage(),
            axis_stats: run.summary.axis_stats.clone(),
            skipped: run.notices.clone(),
            rules: rule_text(),
            thresholds: run.thresholds.rows().to_vec(),
            chart_svg,
            recent,
        })
    }
}

/// Render the chart for `spec` and the full HTML report.
pub fn render_report(
    run: &PipelineRun,
    config: &CbmConfig,
    spec: &ChartSpec,
) -> Result<String, ReportError> {
    if run.diagnosed.is_empty() {
        return Err(ReportError::EmptyRun);
    }
    let svg = render_svg(run, spec)?;
    let doc = ReportDocument::build(run, &config.report.title, config.report.recent_rows, svg)?;
    Ok(html::render_html(&doc))
}
