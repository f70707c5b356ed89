//! Vibration condition monitoring
//!
//! Offline analysis of three-axis vibration recordings from rotating
//! equipment. Tables are loaded from CSV or XLSX, normalized and merged
//! into one time-ordered series, then every row is smoothed with a
//! trailing RMS and checked against thresholds estimated from the data.
//!
//! ## Architecture
//!
//! - **Acquisition**: CSV and workbook readers producing raw tables
//! - **Processing**: normalization, merge, thresholds, RMS, rule classifier
//! - **Pipeline**: one synchronous run over all selected sources
//! - **Report**: SVG chart, paginated HTML report, diagnosed CSV export
//! - **API**: single-session HTTP server over the same pipeline

pub mod acquisition;
pub mod api;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod report;
pub mod types;

// Re-export configuration
pub use config::CbmConfig;

// Re-export commonly used types
pub use types::{
    Axis, AxisThreshold, DiagnosedSample, Diagnosis, RmsReading, Rule, Sample, Series, Severity,
    ThresholdSet,
};

// Re-export the pipeline entry points
pub use acquisition::{load_source, RawSource, SourceError};
pub use pipeline::{compute, DatasetSummary, PipelineError, PipelineRun, SourceInput};
