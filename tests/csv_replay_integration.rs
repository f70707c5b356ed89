//! CSV Replay Integration Test
//!
//! Exercises the file-based path end to end:
//! write CSV to disk -> load_source -> compute -> chart, report and export.

use std::io::Write;

use vibration_cbm::acquisition::{load_source, RawSource};
use vibration_cbm::config::{CbmConfig, NormalizerConfig};
use vibration_cbm::pipeline::{compute, SourceInput};
use vibration_cbm::report::{self, ChartSpec, Signal};
use vibration_cbm::types::{Axis, Rule};

/// 70 quiet rows, then 10 rows with X well above the rest.
fn recording() -> String {
    let mut csv = String::from("T(X),T(Y),T(Z),X,Y,Z,Motor State,T(motor state)\n");
    for i in 0..80 {
        let t = format!("2024-03-01 10:{:02}:{:02}", i / 60, i % 60);
        let (x, y) = if i < 70 { (1.0, 1.0) } else { (4.0, 1.1) };
        let z = if i % 7 == 0 { 0.6 } else { 0.5 };
        csv.push_str(&format!("{t},{t},{t},{x},{y},{z},3,{t}\n"));
    }
    // Dropout and malformed rows
    let t = "2024-03-01 10:01:30";
    csv.push_str(&format!("{t},{t},{t},0,0,0,3,{t}\n"));
    csv.push_str(&format!("garbage,{t},{t},1,1,1,3,{t}\n"));
    csv.push_str(&format!("{t},{t},{t},abc,1,1,3,{t}\n"));
    csv
}

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn csv_replay_end_to_end() {
    let file = write_temp(&recording());
    let source = load_source(file.path(), b',').unwrap();
    assert!(matches!(source, RawSource::Flat(_)));

    let run = compute(
        &[SourceInput::new("recording.csv", &source)],
        &NormalizerConfig::default(),
    )
    .unwrap();

    let stats = &run.summary.sources[0].stats;
    assert_eq!(stats.total_rows, 83);
    assert_eq!(stats.dropout_rows, 1);
    assert_eq!(stats.malformed_timestamps, 1);
    assert_eq!(stats.malformed_values, 1);
    assert_eq!(run.summary.rows, 80);

    // The final rows sit in the high-X tail: radial and asymmetry rules both fire
    let last = run.diagnosed.last().unwrap();
    assert!(last.diagnosis.triggered().contains(&Rule::RadialAsymmetry));
    assert!(last.rms.x > run.thresholds.warning(Axis::X));
    // Early rows are quiet
    assert!(run.diagnosed[10].diagnosis.is_normal());
    assert!(run.summary.flagged_rows > 0);
    assert_eq!(run.summary.normal_rows + run.summary.flagged_rows, 80);
}

#[test]
fn motor_state_gating_drops_stopped_rows() {
    let mut csv = String::from("T(X),T(Y),T(Z),X,Y,Z,T(motor state),Motor State\n");
    for i in 0..10 {
        let t = format!("2024-03-01 10:00:{i:02}");
        let code = if i < 4 { 0 } else { 3 };
        csv.push_str(&format!("{t},{t},{t},1.0,1.0,1.0,{t},{code}\n"));
    }
    let file = write_temp(&csv);
    let source = load_source(file.path(), b',').unwrap();

    let gated = NormalizerConfig {
        motor_state_gating: true,
        ..NormalizerConfig::default()
    };
    let run = compute(&[SourceInput::new("m.csv", &source)], &gated).unwrap();
    assert_eq!(run.summary.rows, 6);
    assert_eq!(run.summary.sources[0].stats.gated_rows, 4);

    let ungated = compute(&[SourceInput::new("m.csv", &source)], &NormalizerConfig::default())
        .unwrap();
    assert_eq!(ungated.summary.rows, 10);
}

#[test]
fn replay_outputs_render() {
    let file = write_temp(&recording());
    let source = load_source(file.path(), b',').unwrap();
    let run = compute(
        &[SourceInput::new("recording.csv", &source)],
        &NormalizerConfig::default(),
    )
    .unwrap();
    let config = CbmConfig::default();

    let spec = ChartSpec::from_config(&config.chart)
        .with_axis(Axis::X)
        .with_signal(Signal::Rms);
    let svg = report::render_svg(&run, &spec).unwrap();
    assert!(svg.contains("<svg"));

    let html = report::render_report(&run, &config, &spec).unwrap();
    assert!(html.contains("<svg"));
    assert!(html.contains("85% Warn"));
    assert!(html.contains("No rule triggered → Normal"));
    assert!(html.contains(&config.report.title));

    let csv = String::from_utf8(report::diagnosed_csv_bytes(&run).unwrap()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Time,X,Y,Z,X RMS,Y RMS,Z RMS,Diagnosis,Severity"
    );
    assert_eq!(lines.count(), 80);
}

#[test]
fn semicolon_delimited_csv() {
    let file = write_temp("T(X);T(Y);T(Z);X;Y;Z\n2024-03-01 10:00:00;2024-03-01 10:00:00;2024-03-01 10:00:00;1.5;1.0;0.5\n");
    let source = load_source(file.path(), b';').unwrap();
    let run = compute(&[SourceInput::new("s.csv", &source)], &NormalizerConfig::default())
        .unwrap();
    assert_eq!(run.diagnosed[0].sample.x, 1.5);
}
