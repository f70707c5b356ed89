//! XLSX workbook loader (zip + quick-xml)
//!
//! Reads only what a data table needs:
//! - `xl/workbook.xml` for sheet names and their relationship ids
//! - `xl/_rels/workbook.xml.rels` to map ids to worksheet parts
//! - `xl/sharedStrings.xml` (optional) for the shared string table
//! - each worksheet's `sheetData`, first row taken as the header
//!
//! Styles are ignored, so date cells arrive as spreadsheet serial numbers and
//! are decoded later by the timestamp parser.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{Cell, RawTable, SourceError, Workbook};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Load a workbook from disk.
pub fn load_workbook(path: impl AsRef<Path>) -> Result<Workbook, SourceError> {
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
    read_workbook(&name, file)
}

/// Read a workbook from any seekable reader.
pub fn read_workbook<R: Read + Seek>(name: &str, reader: R) -> Result<Workbook, SourceError> {
    let mut archive = ZipArchive::new(reader)?;

    let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?
        .ok_or_else(|| SourceError::MissingPart(WORKBOOK_PART.to_string()))?;
    let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?
        .ok_or_else(|| SourceError::MissingPart(WORKBOOK_RELS_PART.to_string()))?;
    let shared = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_refs = parse_sheet_list(&workbook_xml)?;
    let targets = parse_relationships(&rels_xml)?;

    let mut sheets = Vec::with_capacity(sheet_refs.len());
    for (sheet_name, rel_id) in sheet_refs {
        let part = targets
            .get(&rel_id)
            .ok_or_else(|| SourceError::MissingPart(format!("relationship {rel_id}")))?;
        let xml = read_part(&mut archive, part)?
            .ok_or_else(|| SourceError::MissingPart(part.clone()))?;
        let table = parse_sheet(&sheet_name, &xml, &shared)?;
        tracing::debug!(
            workbook = %name,
            sheet = %sheet_name,
            rows = table.row_count(),
            "Loaded worksheet"
        );
        sheets.push(table);
    }

    if sheets.is_empty() {
        return Err(SourceError::MissingPart("worksheet".to_string()));
    }

    Ok(Workbook {
        name: name.to_string(),
        sheets,
    })
}

/// Read one archive member as UTF-8; `None` when absent.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> Result<Option<String>, SourceError> {
    let mut entry = match archive.by_name(part) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Value of an attribute by local name (namespace prefix ignored).
fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, SourceError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

// ============================================================================
// Workbook parts
// ============================================================================

/// (sheet name, relationship id) pairs in workbook order
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name")?;
                let id = attr_value(&e, b"id")?;
                if let (Some(name), Some(id)) = (name, id) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// Relationship id → archive path of the target part
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id")?;
                let target = attr_value(&e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, resolve_target(&target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

/// Shared string table. Rich-text runs are concatenated, phonetic hints dropped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_item && in_text && !in_phonetic => {
                current.push_str(&t.unescape()?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

// ============================================================================
// Worksheets
// ============================================================================

/// Last zero-based column a worksheet may address (XFD)
const MAX_COLUMN: usize = 16_383;

/// Zero-based column index from a cell reference such as "AB12".
///
/// References past column XFD are malformed and yield `None`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for b in letters {
        index = index
            .checked_mul(26)?
            .checked_add(usize::from(b - b'A' + 1))?;
        if index > MAX_COLUMN + 1 {
            return None;
        }
    }
    Some(index - 1)
}

/// Cell under construction while its children stream past.
#[derive(Default)]
struct PendingCell {
    column: usize,
    kind: Option<String>,
    value: String,
}

impl PendingCell {
    fn finish(self, shared: &[String]) -> Cell {
        let raw = self.value.trim();
        match self.kind.as_deref() {
            Some("s") => raw
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .map_or(Cell::Empty, |s| Cell::from_text(s)),
            Some("inlineStr" | "str" | "d") => Cell::from_text(&self.value),
            Some("b") => Cell::Bool(raw == "1"),
            Some("e") => Cell::Empty,
            _ if raw.is_empty() => Cell::Empty,
            _ => raw
                .parse::<f64>()
                .map_or_else(|_| Cell::Text(raw.to_string()), Cell::Number),
        }
    }
}

fn place(row: &mut Vec<Cell>, column: usize, cell: Cell) {
    if column > MAX_COLUMN {
        return;
    }
    if row.len() <= column {
        row.resize(column + 1, Cell::Empty);
    }
    row[column] = cell;
}

/// Parse a worksheet into a table, first non-empty row as header.
fn parse_sheet(name: &str, xml: &str, shared: &[String]) -> Result<RawTable, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut grid: Vec<Vec<Cell>> = Vec::new();
    let mut row: Option<Vec<Cell>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut next_column = 0usize;
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_column = 0;
                }
                b"c" => {
                    let column = attr_value(&e, b"r")?
                        .and_then(|r| column_index(&r))
                        .unwrap_or(next_column);
                    cell = Some(PendingCell {
                        column,
                        kind: attr_value(&e, b"t")?,
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => grid.push(Vec::new()),
                b"c" => {
                    next_column = attr_value(&e, b"r")?
                        .and_then(|r| column_index(&r))
                        .unwrap_or(next_column)
                        + 1;
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(c), Some(r)) = (cell.take(), row.as_mut()) {
                        next_column = c.column + 1;
                        let column = c.column;
                        place(r, column, c.finish(shared));
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        grid.push(r);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let mut rows = grid
        .into_iter()
        .skip_while(|r| r.iter().all(Cell::is_empty));
    let headers = rows
        .next()
        .map(|r| r.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    let rows = rows.filter(|r| !r.iter().all(Cell::is_empty)).collect();

    Ok(RawTable::new(name, headers, rows))
}
