//! Vibration thresholds: fixed analysis constants and the per-run ThresholdSet

use serde::{Deserialize, Serialize};

use super::Axis;

/// Fixed constants of the diagnostic pipeline. None of these are configurable.
pub mod vibration_thresholds {
    /// Percentile used for the warning threshold (85th)
    pub const WARNING_PERCENTILE: f64 = 0.85;
    /// Percentile used for the error threshold (95th)
    pub const ERROR_PERCENTILE: f64 = 0.95;
    /// Trailing RMS window length (samples)
    pub const RMS_WINDOW: usize = 10;
    /// Radial asymmetry limit |x_rms - y_rms| before looseness is flagged
    pub const RADIAL_ASYMMETRY_LIMIT: f64 = 0.2;
    /// Decimal places thresholds are rounded up to
    pub const THRESHOLD_DECIMALS: i32 = 2;
}

/// Warning/error pair for one axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AxisThreshold {
    /// 85th percentile amplitude, rounded up to 2 decimals
    pub warning: f64,
    /// 95th percentile amplitude, rounded up to 2 decimals
    pub error: f64,
}

impl AxisThreshold {
    pub fn new(warning: f64, error: f64) -> Self {
        Self { warning, error }
    }
}

/// Thresholds for all three axes, derived once per run from the full series.
///
/// `error >= warning` holds for any non-degenerate input because quantiles are
/// monotonic, but it is not enforced: a narrow-band axis may have both equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ThresholdSet {
    pub x: AxisThreshold,
    pub y: AxisThreshold,
    pub z: AxisThreshold,
}

impl ThresholdSet {
    pub fn new(x: AxisThreshold, y: AxisThreshold, z: AxisThreshold) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> AxisThreshold {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn warning(&self, axis: Axis) -> f64 {
        self.get(axis).warning
    }

    pub fn error(&self, axis: Axis) -> f64 {
        self.get(axis).error
    }

    /// Rows of the report threshold table: (axis, warning, error)
    pub fn rows(&self) -> [(Axis, AxisThreshold); 3] {
        [(Axis::X, self.x), (Axis::Y, self.y), (Axis::Z, self.z)]
    }
}
