//! Diagnostic Pipeline
//!
//! ```text
//! STAGE 1: Sheet resolution   (every workbook resolved, or the run halts)
//! STAGE 2: Normalize          (per source; unusable sources skipped with a notice)
//! STAGE 3: Merge              (stable sort by time; nothing left = EmptyDataset)
//! STAGE 4: Thresholds         (85th / 95th percentile, once)
//! STAGE 5: RMS                (trailing window of 10, once)
//! STAGE 6: Classify           (per row: diagnosis text + severity)
//! STAGE 7: Summary            (coverage, per-axis stats, counts)
//! ```
//!
//! [`compute`] is a pure function of its inputs. A run is never patched: a new
//! input set means a new call and a new [`PipelineRun`].

mod summary;

pub use summary::{DatasetSummary, SeverityCounts, SourceStats};

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::acquisition::{RawSource, SheetError};
use crate::config::NormalizerConfig;
use crate::processing::{self, ClassifierInput, UnusableSource};
use crate::types::{DiagnosedSample, Series, ThresholdSet};

/// One source handed to the pipeline, with its sheet choice if any.
#[derive(Debug, Clone, Copy)]
pub struct SourceInput<'a> {
    pub name: &'a str,
    pub source: &'a RawSource,
    pub sheet: Option<&'a str>,
}

impl<'a> SourceInput<'a> {
    pub fn new(name: &'a str, source: &'a RawSource) -> Self {
        Self {
            name,
            source,
            sheet: None,
        }
    }

    pub fn with_sheet(mut self, sheet: Option<&'a str>) -> Self {
        self.sheet = sheet;
        self
    }
}

/// A source that contributed nothing, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipNotice {
    pub source: String,
    pub reason: UnusableSource,
}

impl std::fmt::Display for SkipNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} skipped: {}", self.source, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("source '{name}' is a workbook and needs a sheet selection (available: {})", .available.join(", "))]
    IncompleteSelection { name: String, available: Vec<String> },

    #[error("source '{name}' has no sheet '{sheet}' (available: {})", .available.join(", "))]
    UnknownSheet {
        name: String,
        sheet: String,
        available: Vec<String>,
    },

    #[error("no source contributed any rows ({} skipped)", .skipped.len())]
    EmptyDataset { skipped: Vec<SkipNotice> },
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub series: Series,
    pub thresholds: ThresholdSet,
    pub diagnosed: Vec<DiagnosedSample>,
    pub summary: DatasetSummary,
    pub notices: Vec<SkipNotice>,
}

impl PipelineRun {
    /// The last `n` diagnosed rows, oldest first
    pub fn recent(&self, n: usize) -> &[DiagnosedSample] {
        let start = self.diagnosed.len().saturating_sub(n);
        &self.diagnosed[start..]
    }
}

/// Run the full pipeline over the given sources.
pub fn compute(
    sources: &[SourceInput<'_>],
    config: &NormalizerConfig,
) -> Result<PipelineRun, PipelineError> {
    let started = Instant::now();

    // Stage 1: every selection must resolve before anything is processed
    let mut tables = Vec::with_capacity(sources.len());
    for input in sources {
        let table = input.source.resolve(input.sheet).map_err(|e| match e {
            SheetError::NotSelected { available } => PipelineError::IncompleteSelection {
                name: input.name.to_string(),
                available,
            },
            SheetError::Unknown { sheet, available } => PipelineError::UnknownSheet {
                name: input.name.to_string(),
                sheet,
                available,
            },
        })?;
        tables.push((input.name, table));
    }

    // Stage 2: normalize, skipping unusable sources
    let mut parts = Vec::with_capacity(tables.len());
    let mut accepted = Vec::new();
    let mut notices = Vec::new();
    for (name, table) in tables {
        match processing::normalize(table, config) {
            Ok(normalized) => {
                info!(source = %name, rows = normalized.stats.kept_rows, "Source accepted");
                accepted.push(SourceStats {
                    source: name.to_string(),
                    stats: normalized.stats,
                });
                parts.push(normalized.samples);
            }
            Err(reason) => {
                warn!(source = %name, reason = %reason, "Source skipped");
                notices.push(SkipNotice {
                    source: name.to_string(),
                    reason,
                });
            }
        }
    }

    // Stage 3: merge
    let series = match processing::merge(parts) {
        Ok(series) => series,
        Err(processing::EmptyDataset) => {
            return Err(PipelineError::EmptyDataset { skipped: notices });
        }
    };

    // Stage 4: thresholds (series is non-empty here)
    let Some(thresholds) = processing::estimate(&series) else {
        return Err(PipelineError::EmptyDataset { skipped: notices });
    };

    // Stages 5-6: RMS and classification
    let rms = processing::smooth(&series);
    let diagnosed: Vec<DiagnosedSample> = series
        .samples()
        .iter()
        .zip(rms)
        .map(|(sample, rms)| {
            let input = ClassifierInput::new(rms, &thresholds);
            DiagnosedSample {
                sample: *sample,
                rms,
                diagnosis: processing::classify(&input),
                severity: processing::severity(&input),
            }
        })
        .collect();

    // Stage 7: summary
    let summary = DatasetSummary::build(&series, &diagnosed, accepted, notices.clone());

    info!(
        rows = summary.rows,
        flagged = summary.flagged_rows,
        skipped = notices.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "Pipeline run complete"
    );

    Ok(PipelineRun {
        series,
        thresholds,
        diagnosed,
        summary,
        notices,
    })
}
