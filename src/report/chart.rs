//! Time-series chart rendering (plotters, SVG backend)
//!
//! One axis, one signal (raw amplitude or trailing RMS), the warning level as
//! a dashed line and the error level as a dotted line, each labelled at the
//! right edge. Long series are thinned by uniform stride for drawing only.

use chrono::{NaiveDateTime, TimeDelta};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};

use crate::config::ChartConfig;
use crate::pipeline::PipelineRun;
use crate::types::Axis;

const WARNING_COLOR: RGBColor = RGBColor(230, 140, 0);
const ERROR_COLOR: RGBColor = RED;
const SIGNAL_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Dash (and gap) count across the plot width for the warning line
const DASH_SEGMENTS: usize = 80;
/// Dot count across the plot width for the error line
const DOT_COUNT: usize = 160;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("nothing to plot: the run has no samples")]
    EmptyRun,

    #[error("chart drawing failed: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

/// Which signal of the selected axis is plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    #[default]
    Raw,
    Rms,
}

impl Signal {
    pub fn label(self) -> &'static str {
        match self {
            Signal::Raw => "amplitude",
            Signal::Rms => "RMS",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Signal::Raw => "raw",
            Signal::Rms => "rms",
        })
    }
}

impl std::str::FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Signal::Raw),
            "rms" => Ok(Signal::Rms),
            other => Err(format!("unknown signal '{other}' (expected raw or rms)")),
        }
    }
}

/// What to draw and how large.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSpec {
    pub axis: Axis,
    pub signal: Signal,
    pub max_points: usize,
    pub width: u32,
    pub height: u32,
}

impl ChartSpec {
    pub fn from_config(config: &ChartConfig) -> Self {
        Self {
            axis: config.default_axis,
            signal: config.default_signal,
            max_points: config.max_points,
            width: config.width,
            height: config.height,
        }
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal;
        self
    }
}

/// Indices kept when thinning `len` points to at most `max_points`.
///
/// Uniform stride starting at index 0. Returns every index when no thinning
/// is needed.
pub fn decimate(len: usize, max_points: usize) -> Vec<usize> {
    let max_points = max_points.max(1);
    if len <= max_points {
        return (0..len).collect();
    }
    let stride = len.div_ceil(max_points);
    (0..len).step_by(stride).collect()
}

fn seconds_since(t0: NaiveDateTime, t: NaiveDateTime) -> f64 {
    (t - t0).num_milliseconds() as f64 / 1000.0
}

fn time_label(t0: NaiveDateTime, secs: f64) -> String {
    TimeDelta::try_milliseconds((secs * 1000.0).round() as i64)
        .and_then(|d| t0.checked_add_signed(d))
        .map_or_else(String::new, |t| t.format("%m-%d %H:%M:%S").to_string())
}

/// Points (seconds since first sample, value) after decimation
fn plot_points(run: &PipelineRun, spec: &ChartSpec) -> Vec<(f64, f64)> {
    let Some(first) = run.diagnosed.first() else {
        return Vec::new();
    };
    let t0 = first.sample.timestamp;
    decimate(run.diagnosed.len(), spec.max_points)
        .into_iter()
        .filter_map(|i| run.diagnosed.get(i))
        .map(|d| {
            let y = match spec.signal {
                Signal::Raw => d.sample.value(spec.axis),
                Signal::Rms => d.rms.get(spec.axis),
            };
            (seconds_since(t0, d.sample.timestamp), y)
        })
        .collect()
}

/// Render the chart as a standalone SVG document.
pub fn render_svg(run: &PipelineRun, spec: &ChartSpec) -> Result<String, ChartError> {
    let Some(first) = run.diagnosed.first() else {
        return Err(ChartError::EmptyRun);
    };
    let t0 = first.sample.timestamp;
    let points = plot_points(run, spec);
    let limits = run.thresholds.get(spec.axis);

    let x_max = points.last().map_or(0.0, |p| p.0).max(1e-3);
    let data_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let data_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_lo = data_min.min(0.0);
    let mut y_hi = data_max.max(limits.error).max(limits.warning) * 1.1;
    if y_hi <= y_lo {
        y_hi = y_lo + 1.0;
    }

    let title = format!(
        "{} axis {} ({} points of {})",
        spec.axis,
        spec.signal.label(),
        points.len(),
        run.diagnosed.len()
    );
    let x_fmt = |secs: &f64| time_label(t0, *secs);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (spec.width, spec.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..x_max, y_lo..y_hi)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc(format!("{} {}", spec.axis, spec.signal.label()))
            .x_labels(6)
            .x_label_formatter(&x_fmt)
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &SIGNAL_COLOR))
            .map_err(draw_err)?
            .label(format!("{} {}", spec.axis, spec.signal.label()))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &SIGNAL_COLOR));

        // Warning: dashed
        let dash = x_max / (DASH_SEGMENTS as f64 * 2.0);
        chart
            .draw_series((0..DASH_SEGMENTS).map(|i| {
                let start = i as f64 * dash * 2.0;
                PathElement::new(
                    vec![(start, limits.warning), (start + dash, limits.warning)],
                    WARNING_COLOR.stroke_width(2),
                )
            }))
            .map_err(draw_err)?;

        // Error: dotted
        let spacing = x_max / DOT_COUNT as f64;
        chart
            .draw_series(
                (0..=DOT_COUNT).map(|i| Circle::new((i as f64 * spacing, limits.error), 1, ERROR_COLOR.filled())),
            )
            .map_err(draw_err)?;

        let label_style = |color: &'static RGBColor| {
            TextStyle::from(("sans-serif", 13).into_font())
                .color(color)
                .pos(Pos::new(HPos::Right, VPos::Bottom))
        };
        chart
            .draw_series([
                Text::new(
                    format!("85% warn {:.2}", limits.warning),
                    (x_max, limits.warning),
                    label_style(&WARNING_COLOR),
                ),
                Text::new(
                    format!("95% error {:.2}", limits.error),
                    (x_max, limits.error),
                    label_style(&ERROR_COLOR),
                ),
            ])
            .map_err(draw_err)?;

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }

    tracing::debug!(axis = %spec.axis, signal = %spec.signal, points = points.len(), "Rendered chart");
    Ok(svg)
}
