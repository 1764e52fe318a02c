//! Filename sanitization and input type checks.

use std::path::Path;

use crate::defaults::{ALLOWED_EXTENSIONS, FILENAME_MAX_LENGTH};

/// Lower-cased extension of a filename, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether the filename carries one of the accepted document extensions.
pub fn has_allowed_extension(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduce a user-supplied name to a safe single path component.
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; everything else becomes `_`.
/// Leading dots are stripped so the result is never hidden or a traversal.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    let mut result: String = trimmed.chars().take(FILENAME_MAX_LENGTH).collect();
    if result.is_empty() {
        result.push_str("unnamed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories_and_specials() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\my paper.xml"), "my_paper.xml");
        assert_eq!(sanitize_filename(".hidden.txt"), "hidden.txt");
        assert_eq!(sanitize_filename("..."), "unnamed");
        assert_eq!(sanitize_filename("résumé.html"), "r_sum_.html");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).len(), FILENAME_MAX_LENGTH);
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(has_allowed_extension("paper.XML"));
        assert!(has_allowed_extension("notes.txt"));
        assert!(has_allowed_extension("page.htm"));
        assert!(!has_allowed_extension("scan.pdf"));
        assert!(!has_allowed_extension("README"));
        assert_eq!(extension_of("a.b.HTML").as_deref(), Some("html"));
    }
}
