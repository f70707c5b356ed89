//! Threshold estimator: per-axis 85th / 95th percentile amplitudes
//!
//! Percentiles use linear interpolation between order statistics at position
//! `q * (n - 1)`, then round UP to two decimals. Computed once per run over
//! the full merged series.

use crate::types::thresholds::vibration_thresholds::{
    ERROR_PERCENTILE, THRESHOLD_DECIMALS, WARNING_PERCENTILE,
};
use crate::types::{Axis, AxisThreshold, Series, ThresholdSet};

/// Quantile of an ascending-sorted slice, linear interpolation.
///
/// `None` for an empty slice or a non-finite `q`. A single element is its own
/// quantile for every `q`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !q.is_finite() {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let lo_v = *sorted.get(lo)?;
    let hi_v = *sorted.get(hi)?;
    Some(lo_v + (hi_v - lo_v) * (pos - lo as f64))
}

/// Quantile of unsorted values (NaNs are not expected; they sort last).
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// `ceil(v * 100) / 100`
pub fn round_up_cents(v: f64) -> f64 {
    let scale = 10f64.powi(THRESHOLD_DECIMALS);
    (v * scale).ceil() / scale
}

fn axis_threshold(values: &[f64]) -> Option<AxisThreshold> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let warning = quantile_sorted(&sorted, WARNING_PERCENTILE)?;
    let error = quantile_sorted(&sorted, ERROR_PERCENTILE)?;
    Some(AxisThreshold::new(round_up_cents(warning), round_up_cents(error)))
}

/// Derive warning/error thresholds for every axis. `None` for an empty series.
pub fn estimate(series: &Series) -> Option<ThresholdSet> {
    let [x, y, z] = Axis::ALL.map(|axis| axis_threshold(&series.axis_values(axis)));
    Some(ThresholdSet::new(x?, y?, z?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;
    use chrono::NaiveDate;

    #[test]
    fn test_quantile_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(5.0));
        assert_eq!(quantile(&v, 0.5), Some(3.0));
        // pos = 0.85 * 4 = 3.4
        assert!((quantile(&v, 0.85).unwrap() - 4.4).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_quantile_unsorted_input() {
        assert_eq!(quantile(&[5.0, 1.0, 3.0], 0.5), Some(3.0));
    }

    #[test]
    fn test_single_element_population() {
        assert_eq!(quantile(&[7.25], 0.85), Some(7.25));
        assert_eq!(quantile(&[7.25], 0.95), Some(7.25));
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up_cents(1.231), 1.24);
        assert_eq!(round_up_cents(2.0), 2.0);
        assert_eq!(round_up_cents(0.001), 0.01);
    }

    #[test]
    fn test_estimate_monotone_sequence() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let samples = (0..100)
            .map(|i| {
                let v = f64::from(i) / 10.0;
                Sample::new(base + chrono::TimeDelta::seconds(i64::from(i)), v, v * 2.0, v + 1.0)
            })
            .collect();
        let series = Series::from_unsorted(samples);
        let set = estimate(&series).unwrap();
        for axis in Axis::ALL {
            let t = set.get(axis);
            assert!(t.warning <= t.error, "axis {axis}");
        }
        assert!(set.x.warning >= 8.41 && set.x.warning <= 8.42);
        assert!(estimate(&Series::default()).is_none());
    }
}
