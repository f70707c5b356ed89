//! Flat-table (CSV) loader
//!
//! Header row required. Fields are trimmed, rows may be ragged (missing
//! trailing fields read as empty cells). Values stay textual; numeric and
//! timestamp interpretation happens in the normalizer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{Cell, RawTable, SourceError};

const UTF8_BOM: char = '\u{feff}';

/// Read a CSV table from any reader.
pub fn read_csv<R: Read>(name: &str, reader: R, delimiter: u8) -> Result<RawTable, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches(UTF8_BOM).trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(SourceError::NoHeader(name.to_string()));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(Cell::from_text).collect());
    }

    tracing::debug!(source = %name, columns = headers.len(), rows = rows.len(), "Loaded CSV table");

    Ok(RawTable::new(name, headers, rows))
}

/// Load a CSV file from disk. The table is named after the file.
pub fn load_csv(path: impl AsRef<Path>, delimiter: u8) -> Result<RawTable, SourceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    read_csv(&name, file, delimiter)
}
