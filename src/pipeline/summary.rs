//! Run summary: coverage, per-axis statistics and row counts

use chrono::NaiveDateTime;
use serde::Serialize;

use super::SkipNotice;
use crate::processing::{describe, AxisStats, NormalizeStats};
use crate::types::{DiagnosedSample, Series, Severity};

/// Row accounting for a source that contributed samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub stats: NormalizeStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub normal: usize,
    pub warning: usize,
    pub error: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub axis_stats: Vec<AxisStats>,
    /// Rows whose diagnosis is "Normal"
    pub normal_rows: usize,
    /// Rows with at least one rule triggered
    pub flagged_rows: usize,
    pub severity: SeverityCounts,
    pub sources: Vec<SourceStats>,
    pub skipped: Vec<SkipNotice>,
}

impl DatasetSummary {
    pub fn build(
        series: &Series,
        diagnosed: &[DiagnosedSample],
        sources: Vec<SourceStats>,
        skipped: Vec<SkipNotice>,
    ) -> Self {
        let (start, end) = series.time_range().unzip();
        let normal_rows = diagnosed.iter().filter(|d| d.diagnosis.is_normal()).count();
        let mut severity = SeverityCounts::default();
        for d in diagnosed {
            match d.severity {
                Severity::Normal => severity.normal += 1,
                Severity::Warning => severity.warning += 1,
                Severity::Error => severity.error += 1,
            }
        }
        Self {
            rows: series.len(),
            start,
            end,
            axis_stats: describe(series),
            normal_rows,
            flagged_rows: diagnosed.len() - normal_rows,
            severity,
            sources,
            skipped,
        }
    }

    /// "first → last" coverage line, `None` for an empty run
    pub fn coverage(&self) -> Option<String> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(format!(
                "{} → {}",
                s.format("%Y-%m-%d %H:%M:%S"),
                e.format("%Y-%m-%d %H:%M:%S")
            )),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rows:      {}", self.rows)?;
        if let Some(coverage) = self.coverage() {
            writeln!(f, "Coverage:  {coverage}")?;
        }
        writeln!(
            f,
            "Diagnosis: {} normal, {} flagged (severity: {} warning, {} error)",
            self.normal_rows, self.flagged_rows, self.severity.warning, self.severity.error
        )?;
        for s in &self.axis_stats {
            writeln!(
                f,
                "  {}: mean {:.3}  std {:.3}  min {:.3}  max {:.3}",
                s.axis, s.mean, s.std_dev, s.min, s.max
            )?;
        }
        for notice in &self.skipped {
            writeln!(f, "  ! {notice}")?;
        }
        Ok(())
    }
}
