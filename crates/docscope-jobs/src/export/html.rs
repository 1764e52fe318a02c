use std::fmt::Write;

use docscope_core::AnalysisResult;

use super::ExportSummary;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
td.count{text-align:right}";

/// Standalone HTML report: a summary list and one table row per key and section.
pub fn render_html(result: &AnalysisResult, summary: &ExportSummary) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, result, summary);
    out
}

fn write_report(
    out: &mut String,
    result: &AnalysisResult,
    summary: &ExportSummary,
) -> std::fmt::Result {
    let data = &result.data;
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>docscope results {}</title>", summary.job_id)?;
    writeln!(out, "<style>{}</style>", STYLE)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<h1>Analysis results</h1>")?;
    writeln!(out, "<ul class=\"summary\">")?;
    writeln!(out, "<li>Job: {}</li>", summary.job_id)?;
    writeln!(out, "<li>Files processed: {}</li>", result.files_processed)?;
    writeln!(out, "<li>Total matches: {}</li>", result.total_entities)?;
    writeln!(out, "<li>Distinct terms: {}</li>", data.len())?;
    writeln!(out, "<li>Generated: {}</li>", summary.generated_at.to_rfc3339())?;
    writeln!(out, "</ul>")?;

    if data.is_empty() {
        writeln!(out, "<p>No matches found.</p>")?;
    } else {
        writeln!(out, "<table>")?;
        writeln!(
            out,
            "<thead><tr><th>Term</th><th>Category</th><th>Section</th><th>Count</th></tr></thead>"
        )?;
        writeln!(out, "<tbody>")?;
        for (key, entry) in data.iter() {
            let category = escape(entry.category.as_deref().unwrap_or(""));
            let term = escape(key.display_text());
            for (section, count) in &entry.by_section {
                writeln!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td title=\"{}\">{}</td><td class=\"count\">{}</td></tr>",
                    term,
                    category,
                    section.name(),
                    section.code(),
                    count
                )?;
            }
        }
        writeln!(out, "</tbody>")?;
        writeln!(out, "</table>")?;
    }

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

/// Escape text for element content and quoted attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
