//! Signal processing stages
//!
//! normalizer → merger → thresholds → rms → classifier, plus descriptive
//! statistics for the run summary. Every stage is a synchronous function over
//! owned or borrowed data; nothing here holds state between runs.

pub mod classifier;
pub mod merger;
pub mod normalizer;
pub mod rms;
pub mod stats;
pub mod thresholds;

pub use classifier::{classify, severity, ClassifierInput};
pub use merger::{merge, EmptyDataset};
pub use normalizer::{normalize, NormalizeStats, Normalized, UnusableSource, REQUIRED_COLUMNS};
pub use rms::{smooth, trailing_rms};
pub use stats::{describe, AxisStats};
pub use thresholds::{estimate, quantile};
