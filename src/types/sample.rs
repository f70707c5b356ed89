//! Core sample types: Axis, Sample, Series

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// Axis
// ============================================================================

/// One of the three orthogonal measurement axes.
///
/// X and Y are radial (perpendicular to the shaft), Z is axial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in canonical order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Upper-case label used in tables and column names
    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }

    /// Name of the amplitude column in a raw source
    pub fn value_column(self) -> &'static str {
        self.label()
    }

    /// Name of the per-axis timestamp column in a raw source
    pub fn timestamp_column(self) -> &'static str {
        match self {
            Axis::X => "T(X)",
            Axis::Y => "T(Y)",
            Axis::Z => "T(Z)",
        }
    }

    pub fn is_radial(self) -> bool {
        matches!(self, Axis::X | Axis::Y)
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{other}' (expected x, y or z)")),
        }
    }
}

// ============================================================================
// Sample
// ============================================================================

/// A single normalized three-axis reading.
///
/// Produced by the normalizer and never mutated afterwards. Rows whose three
/// amplitudes are all exactly zero never become a `Sample`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    /// Amplitude on the given axis
    pub fn value(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Sensor dropout sentinel: every axis reads exactly zero.
    pub fn is_dropout(x: f64, y: f64, z: f64) -> bool {
        x == 0.0 && y == 0.0 && z == 0.0
    }
}

// ============================================================================
// Series
// ============================================================================

/// Samples ordered ascending by timestamp.
///
/// Duplicate timestamps are allowed. Construction always goes through a stable
/// sort, so samples sharing a timestamp keep the order they were supplied in.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    /// Build a series from samples in arbitrary order (stable sort by timestamp).
    pub fn from_unsorted(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Amplitudes of one axis, in series order
    pub fn axis_values(&self, axis: Axis) -> Vec<f64> {
        self.samples.iter().map(|s| s.value(axis)).collect()
    }

    /// First and last timestamp, `None` for an empty series
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
