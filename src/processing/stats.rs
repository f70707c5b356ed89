//! Descriptive statistics per axis (statrs)

use serde::Serialize;
use statrs::statistics::Statistics;

use crate::types::{Axis, Series};

/// Mean, sample standard deviation, min and max of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisStats {
    pub axis: Axis,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single sample
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl AxisStats {
    pub fn from_values(axis: Axis, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let std_dev = if values.len() > 1 { values.std_dev() } else { 0.0 };
        Some(Self {
            axis,
            mean: values.mean(),
            std_dev,
            min: values.min(),
            max: values.max(),
        })
    }
}

/// Stats for X, Y, Z in order; empty for an empty series.
pub fn describe(series: &Series) -> Vec<AxisStats> {
    Axis::ALL
        .iter()
        .filter_map(|&axis| AxisStats::from_values(axis, &series.axis_values(axis)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;
    use chrono::NaiveDate;

    #[test]
    fn test_describe() {
        let t = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let series = Series::from_unsorted(vec![
            Sample::new(t, 1.0, 2.0, 3.0),
            Sample::new(t, 3.0, 2.0, 5.0),
        ]);
        let stats = describe(&series);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].mean, 2.0);
        assert!((stats[0].std_dev - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats[1].std_dev, 0.0);
        assert_eq!(stats[2].min, 3.0);
        assert_eq!(stats[2].max, 5.0);
        assert!(describe(&Series::default()).is_empty());
    }

    #[test]
    fn test_single_value_std() {
        let s = AxisStats::from_values(Axis::Z, &[4.0]).unwrap();
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.mean, 4.0);
    }
}
