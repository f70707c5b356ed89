//! Trailing-window RMS smoother
//!
//! `rms[i] = sqrt(mean(v[max(0, i-W+1) ..= i]^2))` with W fixed at 10. The
//! window shrinks at the start of the series, so `rms[0] == |v[0]|`. Each
//! window is summed directly; no running sum carries rounding error forward.

use crate::types::thresholds::vibration_thresholds::RMS_WINDOW;
use crate::types::{Axis, RmsReading, Series};

/// Root mean square of a slice. Empty → 0.0.
///
/// Values are scaled by the peak magnitude before squaring so large
/// readings cannot overflow the sum.
pub fn rms_value(signal: &[f64]) -> f64 {
    let peak = signal.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    if peak == 0.0 || !peak.is_finite() {
        return peak;
    }
    let sum_sq: f64 = signal
        .iter()
        .map(|x| {
            let s = x / peak;
            s * s
        })
        .sum();
    peak * (sum_sq / signal.len() as f64).sqrt()
}

/// Causal trailing RMS of every position with the given window length.
pub fn trailing_rms(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            rms_value(&values[start..=i])
        })
        .collect()
}

/// RMS reading per sample, in series order.
pub fn smooth(series: &Series) -> Vec<RmsReading> {
    let [x, y, z] = Axis::ALL.map(|axis| trailing_rms(&series.axis_values(axis), RMS_WINDOW));
    x.into_iter()
        .zip(y)
        .zip(z)
        .map(|((x, y), z)| RmsReading::new(x, y, z))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_is_magnitude() {
        let rms = trailing_rms(&[-3.0, 4.0], RMS_WINDOW);
        assert_eq!(rms[0], 3.0);
        assert!((rms[1] - 12.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_window_slides_after_ten() {
        let mut values = vec![0.0; 10];
        values.push(2.0);
        let rms = trailing_rms(&values, RMS_WINDOW);
        // window for index 10 covers indices 1..=10
        assert!((rms[10] - (4.0f64 / 10.0).sqrt()).abs() < 1e-12);

        let values = vec![2.0; 15];
        assert!(trailing_rms(&values, RMS_WINDOW).iter().all(|v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_causality() {
        let a: Vec<f64> = (0..30).map(|i| f64::from(i) * 0.3).collect();
        let mut b = a.clone();
        for v in b.iter_mut().skip(16) {
            *v = 99.0;
        }
        let ra = trailing_rms(&a, RMS_WINDOW);
        let rb = trailing_rms(&b, RMS_WINDOW);
        assert_eq!(&ra[..=15], &rb[..=15]);
        assert_ne!(ra[16], rb[16]);
    }

    #[test]
    fn test_huge_values_do_not_overflow() {
        let rms = trailing_rms(&[1e200, -1e200], RMS_WINDOW);
        assert_eq!(rms[0], 1e200);
        assert!((rms[1] / 1e200 - 1.0).abs() < 1e-12);
        assert!((rms_value(&[3e160, 4e160]) / 1e160 - 12.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty() {
        assert!(trailing_rms(&[], RMS_WINDOW).is_empty());
        assert_eq!(rms_value(&[]), 0.0);
    }
}
