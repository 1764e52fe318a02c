use docscope_core::MatchResult;

const HEADER: [&str; 4] = ["term", "category", "section", "count"];

/// One row per key and section, CRLF line endings.
pub fn render_csv(data: &MatchResult) -> String {
    let mut out = String::new();
    push_row(&mut out, &HEADER);
    for (key, entry) in data.iter() {
        let category = entry.category.as_deref().unwrap_or("");
        for (section, count) in &entry.by_section {
            let count = count.to_string();
            push_row(
                &mut out,
                &[key.display_text(), category, section.code(), count.as_str()],
            );
        }
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

/// Quote a field when it holds a delimiter, quote or line break.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscope_core::{MatchKey, SectionCode};

    #[test]
    fn test_rows_per_key_and_section() {
        let mut data = MatchResult::new();
        data.record(MatchKey::term("python"), Some("software"), SectionCode::Methods, 2);
        data.record(MatchKey::term("python"), Some("software"), SectionCode::Abstract, 1);
        data.record(MatchKey::entity("org", "NASA"), Some("ORG"), SectionCode::Title, 1);

        let csv = render_csv(&data);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "term,category,section,count",
                "python,software,ABS,1",
                "python,software,MET,2",
                "nasa,ORG,TIL,1",
            ]
        );
    }

    #[test]
    fn test_fields_are_quoted() {
        let mut out = String::new();
        push_row(&mut out, &["say \"hi\"", "a,b", "line\nbreak", "plain"]);
        assert_eq!(out, "\"say \"\"hi\"\"\",\"a,b\",\"line\nbreak\",plain\r\n");
    }

    #[test]
    fn test_empty_result_has_header_only() {
        assert_eq!(render_csv(&MatchResult::new()), "term,category,section,count\r\n");
    }
}
