//! Raw data acquisition
//!
//! Loads recordings from disk or from uploaded bytes into an untyped table
//! model. Nothing here knows about axes or timestamps beyond
//! [`timestamp::parse_timestamp`]; the normalizer turns tables into samples.
//!
//! Two source kinds exist:
//! - **Flat** tables (CSV), usable as-is
//! - **Workbooks** (XLSX), whose sheets must be resolved to exactly one table
//!   before processing ([`RawSource::resolve`])

pub mod csv_source;
pub mod timestamp;
pub mod workbook;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use csv_source::{load_csv, read_csv};
pub use timestamp::parse_timestamp;
pub use workbook::{load_workbook, read_workbook};

/// ZIP local file header magic; every XLSX starts with it.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("workbook XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("workbook is missing part '{0}'")]
    MissingPart(String),

    #[error("source '{0}' has no header row")]
    NoHeader(String),
}

/// Sheet resolution failure for a workbook source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SheetError {
    #[error("no sheet selected (available: {})", .available.join(", "))]
    NotSelected { available: Vec<String> },

    #[error("sheet '{sheet}' not found (available: {})", .available.join(", "))]
    Unknown { sheet: String, available: Vec<String> },
}

// ============================================================================
// Table model
// ============================================================================

/// One cell of a raw table.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Build a cell from delimited text, mapping blanks to `Empty`.
    pub fn from_text(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    /// Numeric value of the cell. Text is parsed; NaN and infinities are rejected.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Cell::Number(v) => *v,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Empty | Cell::Bool(_) => return None,
        };
        v.is_finite().then_some(v)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// A header row plus data rows. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Position of a column by exact (trimmed) header name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell at (row, column), `Empty` when the row is short
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A workbook: named sheets in workbook order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub name: String,
    pub sheets: Vec<RawTable>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&RawTable> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Flat,
    Workbook,
}

/// A loaded source before sheet resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSource {
    Flat(RawTable),
    Workbook(Workbook),
}

impl RawSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            RawSource::Flat(_) => SourceKind::Flat,
            RawSource::Workbook(_) => SourceKind::Workbook,
        }
    }

    /// Sheet names for a workbook, empty for a flat table
    pub fn sheet_names(&self) -> Vec<String> {
        match self {
            RawSource::Flat(_) => Vec::new(),
            RawSource::Workbook(wb) => wb.sheet_names(),
        }
    }

    /// Whether a sheet choice is still needed before this source can be processed.
    pub fn needs_selection(&self) -> bool {
        matches!(self, RawSource::Workbook(wb) if wb.sheets.len() != 1)
    }

    /// Resolve to the single table the normalizer will see.
    ///
    /// Flat tables ignore `sheet`. A workbook with exactly one sheet resolves
    /// to it when no sheet is given; otherwise a selection is required.
    pub fn resolve(&self, sheet: Option<&str>) -> Result<&RawTable, SheetError> {
        match self {
            RawSource::Flat(table) => Ok(table),
            RawSource::Workbook(wb) => match sheet {
                Some(name) => wb.sheet(name).ok_or_else(|| SheetError::Unknown {
                    sheet: name.to_string(),
                    available: wb.sheet_names(),
                }),
                None => match wb.sheets.as_slice() {
                    [only] => Ok(only),
                    _ => Err(SheetError::NotSelected {
                        available: wb.sheet_names(),
                    }),
                },
            },
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

fn is_workbook_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xlsm"))
}

/// Load a source from disk, dispatching on file extension.
pub fn load_source(path: impl AsRef<Path>, delimiter: u8) -> Result<RawSource, SourceError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    if is_workbook_name(&name) {
        Ok(RawSource::Workbook(load_workbook(path)?))
    } else {
        Ok(RawSource::Flat(load_csv(path, delimiter)?))
    }
}

/// Load a source from uploaded bytes. Workbooks are recognised by extension
/// or by the ZIP signature.
pub fn load_bytes(name: &str, bytes: Vec<u8>, delimiter: u8) -> Result<RawSource, SourceError> {
    if is_workbook_name(name) || bytes.starts_with(ZIP_MAGIC) {
        Ok(RawSource::Workbook(read_workbook(name, Cursor::new(bytes))?))
    } else {
        Ok(RawSource::Flat(read_csv(name, bytes.as_slice(), delimiter)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> RawTable {
        RawTable::new(name, vec!["A".into()], vec![vec![Cell::Number(1.0)]])
    }

    #[test]
    fn test_cell_numeric_parsing() {
        assert_eq!(Cell::from_text(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(Cell::from_text("").as_f64(), None);
        assert_eq!(Cell::Text("NaN".into()).as_f64(), None);
        assert_eq!(Cell::Text("abc".into()).as_f64(), None);
        assert_eq!(Cell::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_short_row_reads_empty() {
        let t = RawTable::new("t", vec!["A".into(), "B".into()], vec![vec![Cell::Number(1.0)]]);
        assert_eq!(t.column("B"), Some(1));
        assert!(t.cell(0, 1).is_empty());
        assert!(t.cell(5, 0).is_empty());
    }

    #[test]
    fn test_resolve_single_sheet_workbook() {
        let src = RawSource::Workbook(Workbook {
            name: "a.xlsx".into(),
            sheets: vec![table("Data")],
        });
        assert!(!src.needs_selection());
        assert_eq!(src.resolve(None).unwrap().name, "Data");
    }

    #[test]
    fn test_resolve_multi_sheet_requires_selection() {
        let src = RawSource::Workbook(Workbook {
            name: "a.xlsx".into(),
            sheets: vec![table("One"), table("Two")],
        });
        assert!(src.needs_selection());
        assert_eq!(
            src.resolve(None).unwrap_err(),
            SheetError::NotSelected {
                available: vec!["One".into(), "Two".into()]
            }
        );
        assert_eq!(src.resolve(Some("Two")).unwrap().name, "Two");
        assert!(matches!(
            src.resolve(Some("Three")),
            Err(SheetError::Unknown { .. })
        ));
    }

    #[test]
    fn test_flat_ignores_sheet() {
        let src = RawSource::Flat(table("data.csv"));
        assert_eq!(src.kind(), SourceKind::Flat);
        assert!(src.resolve(Some("whatever")).is_ok());
    }

    #[test]
    fn test_load_bytes_dispatch() {
        let src = load_bytes("data.csv", b"A,B\n1,2\n".to_vec(), b',').unwrap();
        assert_eq!(src.kind(), SourceKind::Flat);
        assert!(load_bytes("data.xlsx", b"not a zip".to_vec(), b',').is_err());
    }
}
