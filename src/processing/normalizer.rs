//! Record normalizer: raw table → canonical (timestamp, x, y, z) samples
//!
//! Row-level problems (bad timestamp, non-numeric amplitude, all-zero
//! dropout) drop the row and bump a counter. Source-level problems (missing
//! columns, nothing left) reject the whole source as [`UnusableSource`].

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::acquisition::{parse_timestamp, RawTable};
use crate::config::NormalizerConfig;
use crate::types::{Axis, Sample};

/// Columns every usable source must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = ["T(X)", "T(Y)", "T(Z)", "X", "Y", "Z"];

/// Optional motor state columns used by motor-state gating
pub const MOTOR_STATE_COLUMN: &str = "Motor State";
pub const MOTOR_STATE_TIME_COLUMN: &str = "T(motor state)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnusableSource {
    #[error("missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("no valid rows ({total_rows} read)")]
    NoValidRows { total_rows: usize },
}

/// Per-source row accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub total_rows: usize,
    pub malformed_timestamps: usize,
    pub malformed_values: usize,
    pub dropout_rows: usize,
    /// Rows removed by motor-state gating
    pub gated_rows: usize,
    /// Rows removed by the minimum amplitude filter
    pub below_amplitude_rows: usize,
    pub kept_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub samples: Vec<Sample>,
    pub stats: NormalizeStats,
}

/// Column positions resolved once per table
struct ColumnMap {
    timestamps: [usize; 3],
    values: [usize; 3],
}

impl ColumnMap {
    fn from_table(table: &RawTable) -> Result<Self, UnusableSource> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| table.column(c).is_none())
            .map(|c| (*c).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(UnusableSource::MissingColumns { columns: missing });
        }

        let find = |name: &str| table.column(name).unwrap_or_default();
        Ok(Self {
            timestamps: Axis::ALL.map(|a| find(a.timestamp_column())),
            values: Axis::ALL.map(|a| find(a.value_column())),
        })
    }
}

/// Timestamps at which the motor reported the running code.
/// `None` when the source lacks the motor state columns.
fn motor_on_times(table: &RawTable, on_code: i64) -> Option<HashSet<NaiveDateTime>> {
    let state_col = table.column(MOTOR_STATE_COLUMN)?;
    let time_col = table.column(MOTOR_STATE_TIME_COLUMN)?;
    let code = on_code as f64;
    let times = (0..table.row_count())
        .filter(|&row| table.cell(row, state_col).as_f64() == Some(code))
        .filter_map(|row| parse_timestamp(table.cell(row, time_col)))
        .collect();
    Some(times)
}

/// Normalize one resolved table.
pub fn normalize(table: &RawTable, config: &NormalizerConfig) -> Result<Normalized, UnusableSource> {
    let columns = ColumnMap::from_table(table)?;
    let mut stats = NormalizeStats {
        total_rows: table.row_count(),
        ..NormalizeStats::default()
    };

    let gate = if config.motor_state_gating {
        let times = motor_on_times(table, config.motor_on_code);
        if times.is_none() {
            tracing::debug!(source = %table.name, "Motor-state gating enabled but columns absent, not gating");
        }
        times
    } else {
        None
    };

    let mut samples = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let stamps = columns.timestamps.map(|c| parse_timestamp(table.cell(row, c)));
        let [Some(tx), Some(ty), Some(tz)] = stamps else {
            stats.malformed_timestamps += 1;
            continue;
        };

        let values = columns.values.map(|c| table.cell(row, c).as_f64());
        let [Some(x), Some(y), Some(z)] = values else {
            stats.malformed_values += 1;
            continue;
        };

        if Sample::is_dropout(x, y, z) {
            stats.dropout_rows += 1;
            continue;
        }

        if let Some(on) = &gate {
            if !(on.contains(&tx) && on.contains(&ty) && on.contains(&tz)) {
                stats.gated_rows += 1;
                continue;
            }
        }

        if let Some(min) = config.min_amplitude {
            if x < min && y < min && z < min {
                stats.below_amplitude_rows += 1;
                continue;
            }
        }

        // Only the X-axis timestamp survives; T(Y) and T(Z) just gate validity.
        samples.push(Sample::new(tx, x, y, z));
    }

    stats.kept_rows = samples.len();
    tracing::debug!(
        source = %table.name,
        total = stats.total_rows,
        kept = stats.kept_rows,
        bad_timestamps = stats.malformed_timestamps,
        bad_values = stats.malformed_values,
        dropouts = stats.dropout_rows,
        "Normalized source"
    );

    if samples.is_empty() {
        return Err(UnusableSource::NoValidRows {
            total_rows: stats.total_rows,
        });
    }

    Ok(Normalized { samples, stats })
}
