//! vibration-cbm - condition monitoring for three-axis vibration recordings
//!
//! # Usage
//!
//! ```bash
//! # Analyze one or more recordings and write chart, report and export
//! vibration-cbm analyze run1.csv shift2.xlsx --sheet shift2.xlsx=Sensors --out-dir out/
//!
//! # List the sheets of a workbook
//! vibration-cbm sheets shift2.xlsx
//!
//! # Start the single-session HTTP server
//! vibration-cbm serve --addr 127.0.0.1:8080
//!
//! # Print or check configuration
//! vibration-cbm config --print-default
//! vibration-cbm config --check cbm_config.toml
//! ```
//!
//! # Environment Variables
//!
//! - `CBM_CONFIG`: Path to a TOML config file
//! - `CBM_CORS_ORIGINS`: Comma-separated origins allowed by the HTTP server
//! - `RUST_LOG`: Logging level (default: info)

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use vibration_cbm::acquisition::{self, RawSource};
use vibration_cbm::api::{create_app, SessionState};
use vibration_cbm::config::{validation, CbmConfig};
use vibration_cbm::pipeline::{self, SourceInput};
use vibration_cbm::report::{self, html, ChartSpec, ReportDocument, Signal};
use vibration_cbm::types::Axis;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "vibration-cbm")]
#[command(about = "Threshold and rule-based diagnosis of three-axis vibration data")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides $CBM_CONFIG and ./cbm_config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline over one or more CSV/XLSX files
    Analyze {
        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Workbook sheet, either SHEET for every multi-sheet workbook or SOURCE=SHEET
        #[arg(long, value_name = "[SOURCE=]SHEET")]
        sheet: Vec<String>,

        /// Axis to chart
        #[arg(long)]
        axis: Option<Axis>,

        /// Signal to chart (raw or rms)
        #[arg(long)]
        signal: Option<Signal>,

        /// Output directory for chart.svg, report.html and diagnosed.csv
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// List the sheets of a workbook
    Sheets {
        file: PathBuf,
    },

    /// Start the HTTP session server
    Serve {
        /// Override the server address
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Print the default config or check a config file
    Config {
        /// Print the built-in defaults as TOML
        #[arg(long, conflicts_with = "check")]
        print_default: bool,

        /// Validate a config file and report unknown keys
        #[arg(long, value_name = "PATH")]
        check: Option<PathBuf>,
    },
}

// ============================================================================
// Sheet selection
// ============================================================================

/// Parsed `--sheet` arguments.
#[derive(Debug, Default)]
struct SheetChoices {
    all: Option<String>,
    by_source: HashMap<String, String>,
}

impl SheetChoices {
    fn parse(args: &[String]) -> Result<Self> {
        let mut choices = Self::default();
        for arg in args {
            match arg.split_once('=') {
                Some((source, sheet)) => {
                    if source.is_empty() || sheet.is_empty() {
                        bail!("Invalid --sheet '{arg}': expected SOURCE=SHEET");
                    }
                    choices.by_source.insert(source.to_string(), sheet.to_string());
                }
                None => {
                    if choices.all.replace(arg.clone()).is_some() {
                        bail!("--sheet without SOURCE= given more than once");
                    }
                }
            }
        }
        Ok(choices)
    }

    /// Choice for a source, matched by full path or by file name.
    ///
    /// A bare SHEET only applies to workbooks with more than one sheet, so a
    /// single-sheet workbook still resolves to its only sheet.
    fn for_source(&self, path: &Path, source: &RawSource) -> Option<&str> {
        let full = path.to_string_lossy();
        let file_name = path.file_name().map(|n| n.to_string_lossy());
        self.by_source
            .get(full.as_ref())
            .or_else(|| file_name.and_then(|n| self.by_source.get(n.as_ref())))
            .or_else(|| self.all.as_ref().filter(|_| source.needs_selection()))
            .map(String::as_str)
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

// ============================================================================
// Commands
// ============================================================================

fn run_analyze(
    config: &CbmConfig,
    files: &[PathBuf],
    sheet_args: &[String],
    axis: Option<Axis>,
    signal: Option<Signal>,
    out_dir: &Path,
) -> Result<()> {
    let choices = SheetChoices::parse(sheet_args)?;
    let delimiter = config
        .input
        .delimiter_byte()
        .context("Configured CSV delimiter is invalid")?;

    let mut loaded = Vec::with_capacity(files.len());
    for path in files {
        let source = acquisition::load_source(path, delimiter)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        info!(
            source = %path.display(),
            sheets = source.sheet_names().len(),
            "Source loaded"
        );
        loaded.push((source_name(path), path, source));
    }

    let inputs: Vec<SourceInput<'_>> = loaded
        .iter()
        .map(|(name, path, source)| {
            SourceInput::new(name, source).with_sheet(choices.for_source(path, source))
        })
        .collect();

    let run = pipeline::compute(&inputs, &config.normalizer).context("Analysis failed")?;
    for notice in &run.notices {
        warn!("{}", notice);
    }

    let mut spec = ChartSpec::from_config(&config.chart);
    if let Some(axis) = axis {
        spec = spec.with_axis(axis);
    }
    if let Some(signal) = signal {
        spec = spec.with_signal(signal);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let svg = report::render_svg(&run, &spec).context("Chart rendering failed")?;
    let chart_path = out_dir.join("chart.svg");
    std::fs::write(&chart_path, &svg)
        .with_context(|| format!("Failed to write {}", chart_path.display()))?;

    let doc = ReportDocument::build(&run, &config.report.title, config.report.recent_rows, svg)
        .context("Report assembly failed")?;
    let report_path = out_dir.join("report.html");
    std::fs::write(&report_path, html::render_html(&doc))
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    let export_path = out_dir.join("diagnosed.csv");
    let file = File::create(&export_path)
        .with_context(|| format!("Failed to create {}", export_path.display()))?;
    report::write_diagnosed_csv(&run, BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    info!(
        chart = %chart_path.display(),
        report = %report_path.display(),
        export = %export_path.display(),
        "Outputs written"
    );
    println!("{}", run.summary);
    println!("Thresholds (85% warn / 95% error):");
    for (axis, t) in run.thresholds.rows() {
        println!("  {axis}: {:.2} / {:.2}", t.warning, t.error);
    }
    Ok(())
}

fn run_sheets(config: &CbmConfig, file: &Path) -> Result<()> {
    let delimiter = config
        .input
        .delimiter_byte()
        .context("Configured CSV delimiter is invalid")?;
    let source = acquisition::load_source(file, delimiter)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    match &source {
        RawSource::Flat(table) => {
            println!("{} is a flat table ({} rows)", file.display(), table.row_count());
        }
        RawSource::Workbook(book) => {
            println!("{} sheets:", file.display());
            for sheet in &book.sheets {
                println!("  {} ({} rows)", sheet.name, sheet.row_count());
            }
        }
    }
    Ok(())
}

async fn run_serve(config: CbmConfig, addr: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let state = SessionState::new(config);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down");
        })
        .await
        .context("HTTP server error")?;

    info!("Shutdown complete");
    Ok(())
}

fn run_config(print_default: bool, check: Option<&Path>) -> Result<()> {
    if print_default {
        let text = CbmConfig::default()
            .to_toml()
            .context("Failed to serialize default config")?;
        print!("{text}");
        return Ok(());
    }
    let Some(path) = check else {
        bail!("Pass --print-default or --check PATH");
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let warnings = validation::validate_unknown_keys(&raw);
    for w in &warnings {
        println!("warning: {w}");
    }
    CbmConfig::load_from_file(path).with_context(|| format!("{} is invalid", path.display()))?;
    println!("{} is valid ({} warnings)", path.display(), warnings.len());
    Ok(())
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if let Command::Config { print_default, check } = &args.command {
        return run_config(*print_default, check.as_deref());
    }

    let config = CbmConfig::load_with_override(args.config.as_deref())
        .context("Failed to load configuration")?;

    match args.command {
        Command::Analyze {
            files,
            sheet,
            axis,
            signal,
            out_dir,
        } => {
            // The pipeline is synchronous; keep it off the async workers
            tokio::task::spawn_blocking(move || {
                run_analyze(&config, &files, &sheet, axis, signal, &out_dir)
            })
            .await
            .context("Analysis task failed")?
        }
        Command::Sheets { file } => run_sheets(&config, &file),
        Command::Serve { addr } => run_serve(config, addr).await,
        Command::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibration_cbm::acquisition::{RawTable, Workbook};

    #[test]
    fn test_sheet_choices_parse() {
        let choices =
            SheetChoices::parse(&["Data".to_string(), "b.xlsx=Run 2".to_string()]).unwrap();
        assert_eq!(choices.all.as_deref(), Some("Data"));
        assert_eq!(choices.by_source.get("b.xlsx").map(String::as_str), Some("Run 2"));
    }

    #[test]
    fn test_sheet_choices_reject_bad_input() {
        assert!(SheetChoices::parse(&["=Data".to_string()]).is_err());
        assert!(SheetChoices::parse(&["a".to_string(), "b".to_string()]).is_err());
    }

    fn workbook(sheets: &[&str]) -> RawSource {
        RawSource::Workbook(Workbook {
            name: "w.xlsx".into(),
            sheets: sheets
                .iter()
                .map(|name| RawTable::new(*name, Vec::new(), Vec::new()))
                .collect(),
        })
    }

    #[test]
    fn test_bare_sheet_skips_single_sheet_workbook() {
        let choices = SheetChoices::parse(&["Data".to_string()]).unwrap();
        let path = Path::new("/data/w.xlsx");

        assert_eq!(choices.for_source(path, &workbook(&["Sensors"])), None);
        assert_eq!(
            choices.for_source(path, &workbook(&["Notes", "Data"])),
            Some("Data")
        );
        let flat = RawSource::Flat(RawTable::new("f", Vec::new(), Vec::new()));
        assert_eq!(choices.for_source(path, &flat), None);
    }

    #[test]
    fn test_named_sheet_applies_to_single_sheet_workbook() {
        let choices = SheetChoices::parse(&["w.xlsx=Sensors".to_string()]).unwrap();
        assert_eq!(
            choices.for_source(Path::new("/data/w.xlsx"), &workbook(&["Sensors"])),
            Some("Sensors")
        );
    }

    #[test]
    fn test_source_name_is_file_name() {
        assert_eq!(source_name(Path::new("/data/run1.csv")), "run1.csv");
    }
}
