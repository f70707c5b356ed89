//! Timestamp decoding for raw cells
//!
//! Accepts the encodings found in exported vibration logs: ISO-8601 / RFC 3339
//! strings, a few locale-style layouts, Unix epochs and spreadsheet serial
//! day numbers. Anything carrying an offset is normalised to UTC. Unparseable
//! values yield `None`; callers drop the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

use super::Cell;

/// Epoch values at or above this are milliseconds
const EPOCH_MILLIS_MIN: f64 = 1e11;
/// Epoch values at or above this (and below the millisecond bound) are seconds
const EPOCH_SECONDS_MIN: f64 = 1e9;
/// Serial day numbers are accepted strictly below this (year 9999)
const SERIAL_DAY_MAX: f64 = 2_958_466.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Layouts with an explicit offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
];

/// Layouts without an offset, taken as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Decode a cell as a UTC timestamp.
pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Number(v) => from_numeric(*v),
        Cell::Text(s) => parse_timestamp_str(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Decode a textual timestamp. Numeric text goes through [`from_numeric`].
pub fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("nat") {
        return None;
    }

    if let Ok(v) = s.parse::<f64>() {
        return from_numeric(v);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Decode a number: epoch milliseconds, epoch seconds, or a serial day number.
pub fn from_numeric(v: f64) -> Option<NaiveDateTime> {
    if !v.is_finite() || v <= 0.0 {
        return None;
    }
    if v >= EPOCH_MILLIS_MIN {
        DateTime::from_timestamp_millis(v.round() as i64).map(|dt| dt.naive_utc())
    } else if v >= EPOCH_SECONDS_MIN {
        DateTime::from_timestamp_millis((v * 1000.0).round() as i64).map(|dt| dt.naive_utc())
    } else if v < SERIAL_DAY_MAX {
        from_serial_day(v)
    } else {
        None
    }
}

/// Spreadsheet serial days counted from 1899-12-30, fraction = time of day.
fn from_serial_day(days: f64) -> Option<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    base.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
