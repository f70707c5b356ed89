//! Workbook Integration Tests
//!
//! Builds minimal XLSX packages in memory with `zip::ZipWriter`, then loads
//! them through the same entry points the CLI and the upload handler use.

use std::io::{Cursor, Write};

use vibration_cbm::acquisition::{load_bytes, load_source, Cell, RawSource, SheetError};
use vibration_cbm::config::NormalizerConfig;
use vibration_cbm::pipeline::{compute, PipelineError, SourceInput};

/// Sheet rows: header via shared strings, timestamps as serial days.
fn sheet_xml(rows: &[(f64, f64, f64, f64)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c><c r="D1" t="s"><v>3</v></c><c r="E1" t="s"><v>4</v></c><c r="F1" t="s"><v>5</v></c></row>
"#,
    );
    for (i, (t, x, y, z)) in rows.iter().enumerate() {
        let r = i + 2;
        xml.push_str(&format!(
            "<row r=\"{r}\"><c r=\"A{r}\"><v>{t}</v></c><c r=\"B{r}\"><v>{t}</v></c><c r=\"C{r}\"><v>{t}</v></c>\
             <c r=\"D{r}\"><v>{x}</v></c><c r=\"E{r}\"><v>{y}</v></c><c r=\"F{r}\"><v>{z}</v></c></row>\n"
        ));
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="6" uniqueCount="6">
<si><t>T(X)</t></si><si><t>T(Y)</t></si><si><t>T(Z)</t></si>
<si><t>X</t></si><si><r><t>Y</t></r></si><si><t>Z</t></si>
</sst>"#;

/// Zip a workbook with the given (sheet name, sheet xml) pairs.
fn build_xlsx(sheets: &[(&str, String)]) -> Vec<u8> {
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        workbook.push_str(&format!(
            r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(workbook.as_bytes()).unwrap();
    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();
    zip.start_file("xl/sharedStrings.xml", options).unwrap();
    zip.write_all(SHARED_STRINGS.as_bytes()).unwrap();
    for (i, (_, xml)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// 2024-03-01 12:00:00 plus `minutes`
fn serial(minutes: u32) -> f64 {
    45352.5 + f64::from(minutes) / 1440.0
}

#[test]
fn single_sheet_workbook_resolves_without_selection() {
    let bytes = build_xlsx(&[(
        "Data",
        sheet_xml(&[(serial(0), 1.0, 1.0, 0.5), (serial(1), 2.0, 1.5, 0.5)]),
    )]);
    let source = load_bytes("pump.xlsx", bytes, b',').unwrap();
    assert!(!source.needs_selection());

    let table = source.resolve(None).unwrap();
    assert_eq!(table.headers, vec!["T(X)", "T(Y)", "T(Z)", "X", "Y", "Z"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(*table.cell(0, 3), Cell::Number(1.0));

    let run = compute(&[SourceInput::new("pump.xlsx", &source)], &NormalizerConfig::default())
        .unwrap();
    assert_eq!(run.diagnosed.len(), 2);
    assert_eq!(
        run.diagnosed[1].sample.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        "2024-03-01 12:01:00"
    );
}

#[test]
fn multi_sheet_workbook_requires_selection() {
    let bytes = build_xlsx(&[
        ("Run 1", sheet_xml(&[(serial(0), 1.0, 1.0, 1.0)])),
        ("Run 2", sheet_xml(&[(serial(5), 3.0, 3.0, 3.0), (serial(6), 4.0, 4.0, 4.0)])),
    ]);
    let source = load_bytes("multi.xlsx", bytes, b',').unwrap();
    assert!(source.needs_selection());
    assert_eq!(source.sheet_names(), vec!["Run 1", "Run 2"]);
    assert!(matches!(
        source.resolve(None),
        Err(SheetError::NotSelected { .. })
    ));

    let err = compute(&[SourceInput::new("multi.xlsx", &source)], &NormalizerConfig::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::IncompleteSelection { .. }));

    let run = compute(
        &[SourceInput::new("multi.xlsx", &source).with_sheet(Some("Run 2"))],
        &NormalizerConfig::default(),
    )
    .unwrap();
    assert_eq!(run.diagnosed.len(), 2);
    assert_eq!(run.diagnosed[0].sample.x, 3.0);
}

#[test]
fn unknown_sheet_lists_available() {
    let bytes = build_xlsx(&[
        ("A", sheet_xml(&[(serial(0), 1.0, 1.0, 1.0)])),
        ("B", sheet_xml(&[(serial(0), 1.0, 1.0, 1.0)])),
    ]);
    let source = load_bytes("ab.xlsx", bytes, b',').unwrap();
    let err = compute(
        &[SourceInput::new("ab.xlsx", &source).with_sheet(Some("C"))],
        &NormalizerConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        PipelineError::UnknownSheet {
            name: "ab.xlsx".into(),
            sheet: "C".into(),
            available: vec!["A".into(), "B".into()],
        }
    );
}

#[test]
fn workbook_detected_by_content_and_extension() {
    let bytes = build_xlsx(&[("Only", sheet_xml(&[(serial(0), 1.0, 1.0, 1.0)]))]);

    // Upload without an .xlsx name still sniffs the ZIP signature
    let sniffed = load_bytes("upload.bin", bytes.clone(), b',').unwrap();
    assert!(matches!(sniffed, RawSource::Workbook(_)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("on_disk.xlsx");
    std::fs::write(&path, &bytes).unwrap();
    let loaded = load_source(&path, b',').unwrap();
    assert_eq!(loaded.sheet_names(), vec!["Only"]);
}

#[test]
fn corrupt_workbook_is_an_error() {
    assert!(load_bytes("broken.xlsx", b"PK\x03\x04not really a zip".to_vec(), b',').is_err());
}
