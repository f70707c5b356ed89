//! Shared data structures for the vibration diagnostic pipeline
//!
//! - Axis, Sample, Series: normalized three-axis readings
//! - ThresholdSet: per-axis warning/error amplitudes (85th / 95th percentile)
//! - RmsReading, Diagnosis, Severity, DiagnosedSample: classifier output

mod diagnosis;
mod sample;
// Exposes the fixed analysis constants as
// `types::thresholds::vibration_thresholds`.
pub mod thresholds;

pub use diagnosis::*;
pub use sample::*;
pub use thresholds::{AxisThreshold, ThresholdSet};
