//! Application configuration: every operator-tunable setting as TOML
//!
//! The analysis itself (percentiles, RMS window, rules) is fixed and has no
//! entry here. Each section implements `Default`, so a missing file or a
//! partial file always yields a complete config.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::defaults;
use crate::report::chart::Signal;
use crate::types::Axis;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `CbmConfig::load()` which searches:
/// 1. `$CBM_CONFIG` env var
/// 2. `./cbm_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CbmConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub normalizer: NormalizerConfig,

    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl CbmConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CBM_CONFIG` environment variable
    /// 2. `./cbm_config.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A file that fails to load is reported and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// An explicit path (e.g. `--config`) must load; otherwise fall back to [`Self::load`].
    pub fn load_with_override(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let config = Self::load_from_file(p)?;
                info!(path = %p.display(), "Loaded config");
                Ok(config)
            }
            None => Ok(Self::load()),
        }
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys are logged, never fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Range-check every field, collecting all failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.input.delimiter_byte().is_none() {
            errors.push(format!(
                "input.delimiter = {:?} must be a single ASCII character",
                self.input.delimiter
            ));
        }

        if let Some(min) = self.normalizer.min_amplitude {
            if !min.is_finite() || min < 0.0 {
                errors.push(format!(
                    "normalizer.min_amplitude = {min} must be a finite value >= 0"
                ));
            }
        }

        if self.chart.max_points < 2 {
            errors.push(format!(
                "chart.max_points = {} must be at least 2",
                self.chart.max_points
            ));
        }
        Self::check_pixels(self.chart.width, "chart.width", &mut errors);
        Self::check_pixels(self.chart.height, "chart.height", &mut errors);

        if self.report.title.trim().is_empty() {
            errors.push("report.title must not be empty".to_string());
        }
        if self.report.recent_rows == 0 || self.report.recent_rows > defaults::REPORT_MAX_RECENT_ROWS {
            errors.push(format!(
                "report.recent_rows = {} must be within 1-{}",
                self.report.recent_rows,
                defaults::REPORT_MAX_RECENT_ROWS
            ));
        }

        if self.server.addr.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "server.addr = '{}' is not a valid socket address",
                self.server.addr
            ));
        }
        if self.server.max_upload_bytes == 0 {
            errors.push("server.max_upload_bytes must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_pixels(value: u32, name: &str, errors: &mut Vec<String>) {
        if !(defaults::CHART_MIN_PX..=defaults::CHART_MAX_PX).contains(&value) {
            errors.push(format!(
                "{name} = {value} must be within {}-{} px",
                defaults::CHART_MIN_PX,
                defaults::CHART_MAX_PX
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {e}"),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// [input]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Field delimiter for flat (CSV) sources
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimiter() -> String {
    defaults::CSV_DELIMITER.to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl InputConfig {
    /// The delimiter as a byte; `None` unless exactly one ASCII character.
    /// `\t` is accepted as an escape for tab.
    pub fn delimiter_byte(&self) -> Option<u8> {
        match self.delimiter.as_str() {
            "\\t" => Some(b'\t'),
            s if s.len() == 1 && s.is_ascii() => s.bytes().next(),
            _ => None,
        }
    }
}

// ============================================================================
// [normalizer]
// ============================================================================

/// Optional row filters. Both are off by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizerConfig {
    /// Keep only rows recorded while the motor reported `motor_on_code`
    #[serde(default)]
    pub motor_state_gating: bool,

    #[serde(default = "default_motor_on_code")]
    pub motor_on_code: i64,

    /// Drop rows where every axis is below this amplitude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amplitude: Option<f64>,
}

fn default_motor_on_code() -> i64 {
    defaults::MOTOR_ON_CODE
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            motor_state_gating: false,
            motor_on_code: default_motor_on_code(),
            min_amplitude: None,
        }
    }
}

// ============================================================================
// [chart]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartConfig {
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    #[serde(default = "default_chart_width")]
    pub width: u32,

    #[serde(default = "default_chart_height")]
    pub height: u32,

    #[serde(default)]
    pub default_axis: Axis,

    #[serde(default)]
    pub default_signal: Signal,
}

fn default_max_points() -> usize {
    defaults::CHART_MAX_POINTS
}

fn default_chart_width() -> u32 {
    defaults::CHART_WIDTH_PX
}

fn default_chart_height() -> u32 {
    defaults::CHART_HEIGHT_PX
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            width: default_chart_width(),
            height: default_chart_height(),
            default_axis: Axis::default(),
            default_signal: Signal::default(),
        }
    }
}

// ============================================================================
// [report]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "default_report_title")]
    pub title: String,

    #[serde(default = "default_recent_rows")]
    pub recent_rows: usize,
}

fn default_report_title() -> String {
    defaults::REPORT_TITLE.to_string()
}

fn default_recent_rows() -> usize {
    defaults::REPORT_RECENT_ROWS
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            recent_rows: default_recent_rows(),
        }
    }
}

// ============================================================================
// [server]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// HTTP bind address, overridable with `serve --addr`
    #[serde(default = "default_server_addr")]
    pub addr: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

fn default_max_upload_bytes() -> usize {
    defaults::MAX_UPLOAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(CbmConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = CbmConfig::from_toml_str(
            r#"
[chart]
max_points = 800
default_axis = "z"
default_signal = "rms"
"#,
        )
        .unwrap();
        assert_eq!(config.chart.max_points, 800);
        assert_eq!(config.chart.default_axis, Axis::Z);
        assert_eq!(config.chart.default_signal, Signal::Rms);
        assert_eq!(config.chart.width, defaults::CHART_WIDTH_PX);
        assert_eq!(config.report.recent_rows, 20);
        assert_eq!(config.normalizer.motor_on_code, 3);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = CbmConfig::default();
        config.input.delimiter = ";;".into();
        config.chart.max_points = 1;
        config.report.recent_rows = 0;
        config.server.addr = "nowhere".into();
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("input.delimiter")));
        assert!(errors.iter().any(|e| e.contains("server.addr")));
    }

    #[test]
    fn test_delimiter_byte() {
        let mut input = InputConfig::default();
        assert_eq!(input.delimiter_byte(), Some(b','));
        input.delimiter = "\\t".into();
        assert_eq!(input.delimiter_byte(), Some(b'\t'));
        input.delimiter = "é".into();
        assert_eq!(input.delimiter_byte(), None);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CbmConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(CbmConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[chart\nmax_points = ").unwrap();
        let err = CbmConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
