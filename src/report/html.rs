//! Paginated HTML report
//!
//! Self-contained: inline CSS and inline SVG, no external assets. Print
//! layout uses `@page` with explicit page breaks:
//! page 1 summary, rules and thresholds; page 2 chart; page 3 recent rows.

use std::fmt::Write;

use super::ReportDocument;

const STYLE: &str = r"
@page { size: A4 landscape; margin: 14mm; }
body { font-family: Helvetica, Arial, sans-serif; color: #222; margin: 0; }
.page { page-break-after: always; break-after: page; padding: 8px 0; }
.page:last-child { page-break-after: auto; break-after: auto; }
h1 { font-size: 22px; margin: 0 0 4px 0; }
h2 { font-size: 16px; border-bottom: 1px solid #999; padding-bottom: 2px; }
.meta { color: #666; font-size: 12px; }
table { border-collapse: collapse; font-size: 12px; }
th, td { border: 1px solid #bbb; padding: 3px 8px; text-align: left; }
th { background: #eee; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
ul.rules li { margin: 2px 0; }
.notice { color: #a33; }
.chart svg { max-width: 100%; height: auto; }
";

/// Minimal HTML escaping for text and attribute content.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn summary_section(doc: &ReportDocument, out: &mut String) -> std::fmt::Result {
    writeln!(out, "<h2>Summary</h2>")?;
    writeln!(out, "<p>Rows analysed: <strong>{}</strong>", doc.rows)?;
    if let Some(coverage) = &doc.coverage {
        writeln!(out, "<br>Time coverage: {}", escape_html(coverage))?;
    }
    writeln!(out, "</p>")?;

    writeln!(out, "<table><tr><th>Axis</th><th>Mean</th><th>Std dev</th><th>Min</th><th>Max</th></tr>")?;
    for s in &doc.axis_stats {
        writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{:.3}</td><td class=\"num\">{:.3}</td><td class=\"num\">{:.3}</td><td class=\"num\">{:.3}</td></tr>",
            s.axis, s.mean, s.std_dev, s.min, s.max
        )?;
    }
    writeln!(out, "</table>")?;

    if !doc.skipped.is_empty() {
        writeln!(out, "<p>Skipped sources:</p><ul>")?;
        for notice in &doc.skipped {
            writeln!(out, "<li class=\"notice\">{}</li>", escape_html(&notice.to_string()))?;
        }
        writeln!(out, "</ul>")?;
    }
    Ok(())
}

fn rules_section(doc: &ReportDocument, out: &mut String) -> std::fmt::Result {
    writeln!(out, "<h2>Diagnostic rules</h2><ul class=\"rules\">")?;
    for line in &doc.rules {
        writeln!(out, "<li>{}</li>", escape_html(line))?;
    }
    writeln!(out, "</ul>")?;

    writeln!(out, "<h2>Thresholds</h2>")?;
    writeln!(out, "<table><tr><th>Axis</th><th>85% Warn</th><th>95% Error</th></tr>")?;
    for (axis, t) in &doc.thresholds {
        writeln!(
            out,
            "<tr><td>{axis}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td></tr>",
            t.warning, t.error
        )?;
    }
    writeln!(out, "</table>")
}

fn recent_section(doc: &ReportDocument, out: &mut String) -> std::fmt::Result {
    writeln!(out, "<h2>Most recent {} diagnosed rows</h2>", doc.recent.len())?;
    writeln!(
        out,
        "<table><tr><th>Time</th><th>X RMS</th><th>Y RMS</th><th>Z RMS</th><th>Diagnosis</th></tr>"
    )?;
    for row in &doc.recent {
        writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td></tr>",
            row.time,
            row.x_rms,
            row.y_rms,
            row.z_rms,
            escape_html(&row.diagnosis)
        )?;
    }
    writeln!(out, "</table>")
}

fn write_document(doc: &ReportDocument, out: &mut String) -> std::fmt::Result {
    let title = escape_html(&doc.title);
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\"><head><meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{title}</title><style>{STYLE}</style></head><body>")?;

    writeln!(out, "<section class=\"page\">")?;
    writeln!(out, "<h1>{title}</h1>")?;
    writeln!(out, "<div class=\"meta\">Generated {} UTC</div>", doc.generated_at)?;
    summary_section(doc, out)?;
    rules_section(doc, out)?;
    writeln!(out, "</section>")?;

    writeln!(out, "<section class=\"page\"><h2>Chart</h2>")?;
    writeln!(out, "<div class=\"chart\">{}</div>", doc.chart_svg)?;
    writeln!(out, "</section>")?;

    writeln!(out, "<section class=\"page\">")?;
    recent_section(doc, out)?;
    writeln!(out, "</section>")?;

    writeln!(out, "</body></html>")
}

/// Render the report document as HTML.
pub fn render_html(doc: &ReportDocument) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_document(doc, &mut out);
    out
}
