//! Vibration Recording Simulation
//!
//! Generates a synthetic three-axis accelerometer recording in the CSV
//! layout `vibration-cbm analyze` reads. The run moves through:
//! - Normal running
//! - Unbalance (both radial axes rise together)
//! - Axial load (Z rises)
//! - Looseness (X rises alone, radial asymmetry)
//! - Recovery
//!
//! Sensor dropouts (all axes zero) and corrupted timestamps are injected
//! at configurable rates so the normalizer has something to reject.
//!
//! # Usage
//! ```bash
//! ./vibration-simulation --minutes 30 --seed 7 --out pump_a.csv
//! ./vibration-cbm analyze pump_a.csv
//! ```

use std::f64::consts::TAU;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{NaiveDateTime, TimeDelta};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

// ============================================================================
// Machine Constants
// ============================================================================

/// Shaft rotation frequency (Hz)
const SHAFT_HZ: f64 = 24.7;
/// Baseline radial amplitude
const BASE_RADIAL: f64 = 1.2;
/// Baseline axial amplitude
const BASE_AXIAL: f64 = 0.6;
/// Motor state code written while running
const MOTOR_ON: i64 = 3;
/// Motor state code written while stopped
const MOTOR_OFF: i64 = 0;
/// Per-axis timestamp skew of the Y and Z channels (ms)
const CHANNEL_SKEW_MS: i64 = 3;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "vibration-simulation")]
#[command(about = "Synthetic three-axis vibration data for vibration-cbm testing")]
#[command(version)]
struct Args {
    /// Recording length in minutes
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=1440))]
    minutes: u32,

    /// Output sample rate in Hz
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..=100))]
    sample_rate: u32,

    /// Recording start time
    #[arg(long, default_value = "2024-03-01T08:00:00")]
    start: NaiveDateTime,

    /// Fraction of rows written as sensor dropouts
    #[arg(long, default_value = "0.01")]
    dropout_rate: f64,

    /// Fraction of rows with a corrupted T(X) timestamp
    #[arg(long, default_value = "0.005")]
    corrupt_rate: f64,

    /// Add `T(motor state)` and `Motor State` columns with short stops
    #[arg(long)]
    motor_state: bool,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Suppress the progress log on stderr
    #[arg(short, long)]
    quiet: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Simulation Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Healthy machine (0-40%)
    Normal,
    /// Mass unbalance, radial growth on X and Y (40-60%)
    Unbalance,
    /// Axial load or misalignment (60-75%)
    Axial,
    /// Mechanical looseness, X only (75-90%)
    Looseness,
    /// Back to normal after maintenance (90-100%)
    Recovery,
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal running",
            Self::Unbalance => "Unbalance (radial growth)",
            Self::Axial => "Axial load",
            Self::Looseness => "Looseness (radial asymmetry)",
            Self::Recovery => "Recovery",
        }
    }

    fn from_progress(progress: f64) -> Self {
        match progress {
            p if p < 0.40 => Self::Normal,
            p if p < 0.60 => Self::Unbalance,
            p if p < 0.75 => Self::Axial,
            p if p < 0.90 => Self::Looseness,
            _ => Self::Recovery,
        }
    }

    /// Amplitude multipliers for (X, Y, Z) at `ramp` in [0, 1] through the phase.
    fn gains(self, ramp: f64) -> (f64, f64, f64) {
        match self {
            Self::Normal | Self::Recovery => (1.0, 1.0, 1.0),
            Self::Unbalance => {
                let g = 1.0 + 1.5 * ramp;
                (g, g * 0.95, 1.0)
            }
            Self::Axial => (1.1, 1.1, 1.0 + 3.0 * ramp),
            Self::Looseness => (1.0 + 2.5 * ramp, 1.0, 1.1),
        }
    }

    const fn start(self) -> f64 {
        match self {
            Self::Normal => 0.0,
            Self::Unbalance => 0.40,
            Self::Axial => 0.60,
            Self::Looseness => 0.75,
            Self::Recovery => 0.90,
        }
    }

    const fn span(self) -> f64 {
        match self {
            Self::Normal => 0.40,
            Self::Unbalance => 0.20,
            Self::Axial | Self::Looseness => 0.15,
            Self::Recovery => 0.10,
        }
    }
}

// ============================================================================
// Simulation State
// ============================================================================

struct SimulationState {
    rng: StdRng,
    phase: Phase,
    total_samples: u64,
    sample_period: f64,
    start: NaiveDateTime,
    noise: Normal<f64>,
    rows_written: u64,
    dropouts: u64,
    corrupted: u64,
    stopped: u64,
}

/// One generated row before formatting.
struct Row {
    timestamp: NaiveDateTime,
    values: [f64; 3],
    running: bool,
    corrupt: bool,
}

impl SimulationState {
    fn new(args: &Args) -> Result<Self, rand_distr::NormalError> {
        let rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            phase: Phase::Normal,
            total_samples: u64::from(args.minutes) * 60 * u64::from(args.sample_rate),
            sample_period: 1.0 / f64::from(args.sample_rate),
            start: args.start,
            noise: Normal::new(0.0, 0.08)?,
            rows_written: 0,
            dropouts: 0,
            corrupted: 0,
            stopped: 0,
        })
    }

    fn progress(&self, i: u64) -> f64 {
        i as f64 / self.total_samples as f64
    }

    /// Returns true when the phase changed.
    fn update_phase(&mut self, i: u64) -> bool {
        let next = Phase::from_progress(self.progress(i));
        let changed = next != self.phase;
        self.phase = next;
        changed
    }

    fn next_row(&mut self, i: u64, args: &Args) -> Row {
        let t = i as f64 * self.sample_period;
        let micros = (t * 1_000_000.0).round() as i64;
        let timestamp = self.start + TimeDelta::microseconds(micros);

        // Short motor stop every ~5 minutes when motor state is simulated
        let running = !args.motor_state || (t % 300.0) >= 15.0;
        if !running {
            self.stopped += 1;
        }

        let ramp = ((self.progress(i) - self.phase.start()) / self.phase.span()).clamp(0.0, 1.0);
        let (gx, gy, gz) = self.phase.gains(ramp);
        let idle = if running { 1.0 } else { 0.05 };
        let angle = TAU * SHAFT_HZ * t;

        let mut values = [
            idle * BASE_RADIAL * gx * angle.sin() + self.noise.sample(&mut self.rng),
            idle * BASE_RADIAL * gy * angle.cos() + self.noise.sample(&mut self.rng),
            idle * BASE_AXIAL * gz * (2.0 * angle).sin() + self.noise.sample(&mut self.rng),
        ];

        if self.rng.gen_bool(args.dropout_rate.clamp(0.0, 1.0)) {
            values = [0.0; 3];
            self.dropouts += 1;
        }
        let corrupt = self.rng.gen_bool(args.corrupt_rate.clamp(0.0, 1.0));
        if corrupt {
            self.corrupted += 1;
        }

        Row {
            timestamp,
            values,
            running,
            corrupt,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn header(motor_state: bool) -> Vec<&'static str> {
    let mut cols = vec!["T(X)", "T(Y)", "T(Z)", "X", "Y", "Z"];
    if motor_state {
        cols.extend(["T(motor state)", "Motor State"]);
    }
    cols
}

fn record(row: &Row, motor_state: bool) -> Vec<String> {
    let skew = TimeDelta::milliseconds(CHANNEL_SKEW_MS);
    let tx = if row.corrupt {
        "##########".to_string()
    } else {
        row.timestamp.format(TIME_FORMAT).to_string()
    };
    let mut fields = vec![
        tx,
        (row.timestamp + skew).format(TIME_FORMAT).to_string(),
        (row.timestamp + skew + skew).format(TIME_FORMAT).to_string(),
        format!("{:.4}", row.values[0]),
        format!("{:.4}", row.values[1]),
        format!("{:.4}", row.values[2]),
    ];
    if motor_state {
        fields.push(row.timestamp.format(TIME_FORMAT).to_string());
        let code = if row.running { MOTOR_ON } else { MOTOR_OFF };
        fields.push(code.to_string());
    }
    fields
}

fn log_progress(quiet: bool, message: &str) {
    if !quiet {
        eprintln!("[simulation] {message}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut state = SimulationState::new(&args)?;

    let sink: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(io::BufWriter::new(sink));
    writer.write_record(header(args.motor_state))?;

    log_progress(args.quiet, &"=".repeat(60));
    log_progress(
        args.quiet,
        &format!(
            "{} min at {} Hz ({} rows), start {}",
            args.minutes, args.sample_rate, state.total_samples, args.start
        ),
    );
    if let Some(seed) = args.seed {
        log_progress(args.quiet, &format!("Random seed: {seed}"));
    }
    log_progress(args.quiet, &format!("Phase: {}", state.phase.name()));

    for i in 0..state.total_samples {
        if state.update_phase(i) {
            log_progress(
                args.quiet,
                &format!("{:>5.1}% Phase: {}", state.progress(i) * 100.0, state.phase.name()),
            );
        }
        let row = state.next_row(i, &args);
        writer.write_record(record(&row, args.motor_state))?;
        state.rows_written += 1;
    }
    writer.flush()?;

    log_progress(
        args.quiet,
        &format!(
            "Done: {} rows, {} dropouts, {} corrupted timestamps, {} stopped",
            state.rows_written, state.dropouts, state.corrupted, state.stopped
        ),
    );
    Ok(())
}
