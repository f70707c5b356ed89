//! Default values for every configurable setting, grouped by section.

// ============================================================================
// Config file discovery
// ============================================================================

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "CBM_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "cbm_config.toml";

// ============================================================================
// Input
// ============================================================================

pub const CSV_DELIMITER: &str = ",";

// ============================================================================
// Normalizer
// ============================================================================

/// `Motor State` value meaning "running" in the acquisition logs
pub const MOTOR_ON_CODE: i64 = 3;

// ============================================================================
// Chart
// ============================================================================

/// Upper bound on plotted points per chart.
///
/// Larger series are decimated by uniform stride for display only.
pub const CHART_MAX_POINTS: usize = 5_000;
pub const CHART_WIDTH_PX: u32 = 1_200;
pub const CHART_HEIGHT_PX: u32 = 480;

pub const CHART_MIN_PX: u32 = 200;
pub const CHART_MAX_PX: u32 = 10_000;

// ============================================================================
// Report
// ============================================================================

pub const REPORT_TITLE: &str = "Vibration Condition Monitoring Report";

/// Most recent diagnosed rows listed in the report
pub const REPORT_RECENT_ROWS: usize = 20;

pub const REPORT_MAX_RECENT_ROWS: usize = 1_000;

// ============================================================================
// Server
// ============================================================================

pub const SERVER_ADDR: &str = "127.0.0.1:8080";

/// Upload limit per source (64 MiB)
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
