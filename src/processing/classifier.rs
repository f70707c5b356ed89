//! Diagnostic classifier
//!
//! Pure function of one RMS reading and the run's thresholds. Only warning
//! thresholds drive the rules; the error tier feeds [`severity`] alone.

use crate::types::thresholds::vibration_thresholds::RADIAL_ASYMMETRY_LIMIT;
use crate::types::{Axis, Diagnosis, RmsReading, Rule, Severity, ThresholdSet};

/// Everything the classifier looks at for one row.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub rms: RmsReading,
    pub thresholds: &'a ThresholdSet,
}

impl<'a> ClassifierInput<'a> {
    pub fn new(rms: RmsReading, thresholds: &'a ThresholdSet) -> Self {
        Self { rms, thresholds }
    }
}

fn fires(rule: Rule, input: &ClassifierInput<'_>) -> bool {
    let rms = input.rms;
    let t = input.thresholds;
    match rule {
        Rule::RadialOverWarning => rms.x > t.warning(Axis::X) || rms.y > t.warning(Axis::Y),
        Rule::AxialOverWarning => rms.z > t.warning(Axis::Z),
        Rule::RadialAsymmetry => (rms.x - rms.y).abs() > RADIAL_ASYMMETRY_LIMIT,
    }
}

/// Evaluate the rules in fixed order.
pub fn classify(input: &ClassifierInput<'_>) -> Diagnosis {
    Diagnosis::from_rules(Rule::ORDERED.into_iter().filter(|&rule| fires(rule, input)))
}

/// Error if any axis RMS exceeds its error threshold, Warning if any exceeds
/// its warning threshold, else Normal.
pub fn severity(input: &ClassifierInput<'_>) -> Severity {
    let over = |limit: fn(&ThresholdSet, Axis) -> f64| {
        Axis::ALL
            .iter()
            .any(|&axis| input.rms.get(axis) > limit(input.thresholds, axis))
    };
    if over(ThresholdSet::error) {
        Severity::Error
    } else if over(ThresholdSet::warning) {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AxisThreshold;

    fn thresholds(warn: f64, err: f64) -> ThresholdSet {
        let t = AxisThreshold::new(warn, err);
        ThresholdSet::new(t, t, t)
    }

    #[test]
    fn test_normal_when_nothing_fires() {
        let t = thresholds(4.0, 5.0);
        let input = ClassifierInput::new(RmsReading::new(1.0, 1.1, 1.0), &t);
        assert_eq!(classify(&input).to_string(), "Normal");
        assert_eq!(severity(&input), Severity::Normal);
    }

    #[test]
    fn test_all_rules_in_order() {
        let t = thresholds(1.0, 10.0);
        let input = ClassifierInput::new(RmsReading::new(5.0, 2.0, 3.0), &t);
        assert_eq!(
            classify(&input).to_string(),
            "radial RMS over warning — possible unbalance/misalignment; \
             axial RMS over warning — possible axial load/misalignment; \
             radial asymmetry — possible looseness"
        );
        assert_eq!(severity(&input), Severity::Warning);
    }

    #[test]
    fn test_radial_and_asymmetry() {
        let t = ThresholdSet::new(
            AxisThreshold::new(4.0, 6.0),
            AxisThreshold::new(10.0, 12.0),
            AxisThreshold::new(10.0, 12.0),
        );
        let input = ClassifierInput::new(RmsReading::new(5.0, 4.7, 0.0), &t);
        let d = classify(&input);
        assert_eq!(d.triggered(), &[Rule::RadialOverWarning, Rule::RadialAsymmetry]);
    }

    #[test]
    fn test_boundaries_are_strict() {
        let t = thresholds(2.0, 3.0);
        let input = ClassifierInput::new(RmsReading::new(2.0, 1.8, 2.0), &t);
        assert!(classify(&input).is_normal());
    }

    #[test]
    fn test_idempotent() {
        let t = thresholds(1.0, 2.0);
        let input = ClassifierInput::new(RmsReading::new(1.5, 0.2, 2.5), &t);
        assert_eq!(classify(&input), classify(&input));
        assert_eq!(severity(&input), Severity::Error);
    }
}
