//! Pipeline Regression Tests
//!
//! Small hand-computed datasets pushed through `pipeline::compute`, with
//! assertions on row survival, trailing RMS values, rule ordering and the
//! skip/abort behavior for unusable sources.

use vibration_cbm::acquisition::{Cell, RawSource, RawTable, Workbook};
use vibration_cbm::config::NormalizerConfig;
use vibration_cbm::pipeline::{compute, PipelineError, SourceInput};
use vibration_cbm::processing::{classify, severity, ClassifierInput, UnusableSource};
use vibration_cbm::types::{Axis, AxisThreshold, RmsReading, Rule, Severity, ThresholdSet};

const FULL_HEADER: [&str; 6] = ["T(X)", "T(Y)", "T(Z)", "X", "Y", "Z"];

fn row(t: &str, x: f64, y: f64, z: f64) -> Vec<Cell> {
    vec![
        Cell::from_text(t),
        Cell::from_text(t),
        Cell::from_text(t),
        Cell::Number(x),
        Cell::Number(y),
        Cell::Number(z),
    ]
}

fn flat(name: &str, rows: Vec<Vec<Cell>>) -> RawSource {
    RawSource::Flat(RawTable::new(
        name,
        FULL_HEADER.iter().map(|s| (*s).to_string()).collect(),
        rows,
    ))
}

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

#[test]
fn dropout_row_removed_and_rms_spans_survivors() {
    let src = flat(
        "a.csv",
        vec![
            row("2024-03-01 10:00:01", 1.0, 1.0, 1.0),
            row("2024-03-01 10:00:02", 0.0, 0.0, 0.0),
            row("2024-03-01 10:00:03", 5.0, 5.0, 0.1),
        ],
    );
    let run = compute(&[SourceInput::new("a.csv", &src)], &NormalizerConfig::default()).unwrap();

    assert_eq!(run.diagnosed.len(), 2);
    let last = &run.diagnosed[1];
    assert_eq!(last.sample.x, 5.0);
    // sqrt((1 + 25) / 2)
    assert_close(last.rms.x, 3.6056, 1e-4);
    assert_close(last.rms.y, 3.6056, 1e-4);
    // sqrt((1 + 0.01) / 2)
    assert_close(last.rms.z, 0.7106, 1e-4);

    // First row's window holds only itself
    assert_close(run.diagnosed[0].rms.x, 1.0, 1e-12);

    let stats = &run.summary.sources[0].stats;
    assert_eq!(stats.total_rows, 3);
    assert_eq!(stats.dropout_rows, 1);
    assert_eq!(stats.kept_rows, 2);
}

#[test]
fn thresholds_follow_percentiles_of_merged_series() {
    // X = 1..=10; 85th percentile at position 7.65 -> 8.65, 95th -> 9.55
    let rows = (1..=10)
        .map(|i| row(&format!("2024-03-01 10:00:{i:02}"), f64::from(i), 1.0, 1.0))
        .collect();
    let src = flat("a.csv", rows);
    let run = compute(&[SourceInput::new("a.csv", &src)], &NormalizerConfig::default()).unwrap();

    // Rounded up to cents; float artifacts may add one cent
    assert_close(run.thresholds.warning(Axis::X), 8.65, 0.011);
    assert_close(run.thresholds.error(Axis::X), 9.55, 0.011);
    assert!(run.thresholds.warning(Axis::X) >= 8.65);
    assert!(run.thresholds.error(Axis::X) >= run.thresholds.warning(Axis::X));
    assert_close(run.thresholds.warning(Axis::Y), 1.0, 0.011);
}

#[test]
fn sources_merged_in_time_order() {
    let a = flat(
        "a.csv",
        vec![
            row("2024-03-01 10:00:01", 1.0, 1.0, 1.0),
            row("2024-03-01 10:00:05", 3.0, 3.0, 3.0),
        ],
    );
    let b = flat("b.csv", vec![row("2024-03-01 10:00:03", 2.0, 2.0, 2.0)]);
    let run = compute(
        &[SourceInput::new("a.csv", &a), SourceInput::new("b.csv", &b)],
        &NormalizerConfig::default(),
    )
    .unwrap();

    let xs: Vec<f64> = run.diagnosed.iter().map(|d| d.sample.x).collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    assert_eq!(run.summary.sources.len(), 2);
}

#[test]
fn source_missing_axis_skipped_then_empty_dataset() {
    let src = RawSource::Flat(RawTable::new(
        "noz.csv",
        ["T(X)", "T(Y)", "T(Z)", "X", "Y"]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        vec![vec![
            Cell::from_text("2024-03-01 10:00:01"),
            Cell::from_text("2024-03-01 10:00:01"),
            Cell::from_text("2024-03-01 10:00:01"),
            Cell::Number(1.0),
            Cell::Number(1.0),
        ]],
    ));
    let err = compute(&[SourceInput::new("noz.csv", &src)], &NormalizerConfig::default())
        .unwrap_err();

    let PipelineError::EmptyDataset { skipped } = err else {
        panic!("expected EmptyDataset, got {err:?}");
    };
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].source, "noz.csv");
    assert_eq!(
        skipped[0].reason,
        UnusableSource::MissingColumns {
            columns: vec!["Z".to_string()]
        }
    );
}

#[test]
fn unusable_source_skipped_alongside_good_one() {
    let good = flat("good.csv", vec![row("2024-03-01 10:00:01", 1.0, 2.0, 3.0)]);
    let bad = flat("bad.csv", vec![row("not a time", 1.0, 2.0, 3.0)]);
    let run = compute(
        &[SourceInput::new("good.csv", &good), SourceInput::new("bad.csv", &bad)],
        &NormalizerConfig::default(),
    )
    .unwrap();

    assert_eq!(run.diagnosed.len(), 1);
    assert_eq!(run.notices.len(), 1);
    assert_eq!(run.notices[0].source, "bad.csv");
    assert!(matches!(
        run.notices[0].reason,
        UnusableSource::NoValidRows { total_rows: 1 }
    ));
}

#[test]
fn unselected_workbook_aborts_whole_run() {
    let good = flat("good.csv", vec![row("2024-03-01 10:00:01", 1.0, 2.0, 3.0)]);
    let wb = RawSource::Workbook(Workbook {
        name: "multi.xlsx".into(),
        sheets: vec![
            RawTable::new("Run 1", vec![], vec![]),
            RawTable::new("Run 2", vec![], vec![]),
        ],
    });
    let err = compute(
        &[SourceInput::new("good.csv", &good), SourceInput::new("multi.xlsx", &wb)],
        &NormalizerConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::IncompleteSelection { ref name, .. } if name == "multi.xlsx"));
}

#[test]
fn rule_messages_keep_fixed_order() {
    let warn = AxisThreshold::new(4.0, 6.0);
    let thresholds = ThresholdSet::new(warn, warn, warn);
    let input = ClassifierInput::new(RmsReading::new(5.0, 4.7, 0.0), &thresholds);

    let diagnosis = classify(&input);
    assert_eq!(
        diagnosis.triggered(),
        &[Rule::RadialOverWarning, Rule::RadialAsymmetry]
    );
    assert_eq!(
        diagnosis.to_string(),
        "radial RMS over warning — possible unbalance/misalignment; \
         radial asymmetry — possible looseness"
    );
    assert_eq!(severity(&input), Severity::Warning);
}

#[test]
fn all_rules_and_error_severity() {
    let t = AxisThreshold::new(1.0, 2.0);
    let thresholds = ThresholdSet::new(t, t, t);
    let input = ClassifierInput::new(RmsReading::new(3.0, 1.5, 1.2), &thresholds);

    let diagnosis = classify(&input);
    assert_eq!(diagnosis.triggered(), &Rule::ORDERED);
    assert_eq!(severity(&input), Severity::Error);

    let quiet = ClassifierInput::new(RmsReading::new(0.5, 0.5, 0.5), &thresholds);
    assert_eq!(classify(&quiet).to_string(), "Normal");
    assert_eq!(severity(&quiet), Severity::Normal);
}
