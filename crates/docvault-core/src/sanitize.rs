//! Name sanitization for storage-safe path tokens.
//!
//! Folder names become lower-case hyphenated tokens; file names keep
//! their case and extension but lose characters the object store cannot
//! address safely. Sanitized tokens are the only things that ever enter
//! a materialized path or a storage key.

/// Sanitize a folder name into a path segment.
///
/// Lower-cases, replaces whitespace runs with a single hyphen, strips
/// everything outside `[a-z0-9-_]`, collapses repeated hyphens, and
/// trims leading/trailing hyphens.
pub fn sanitize_folder_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_hyphen = true; // suppress a leading hyphen
    for ch in name.to_lowercase().chars() {
        if ch.is_whitespace() || ch == '-' {
            if !last_hyphen {
                out.push('-');
                last_hyphen = true;
            }
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
            last_hyphen = false;
        }
        // everything else is dropped
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Sanitize a file name for use in a storage key.
///
/// Keeps ASCII alphanumerics, dots, hyphens, and underscores; replaces
/// anything else with an underscore, collapsing runs and trimming the
/// ends.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' {
            out.push(ch);
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_name_lowercased_and_hyphenated() {
        assert_eq!(sanitize_folder_name("My Tax Documents"), "my-tax-documents");
        assert_eq!(sanitize_folder_name("Docs"), "docs");
    }

    #[test]
    fn test_folder_name_strips_special_characters() {
        assert_eq!(sanitize_folder_name("Q1/Q2 (2024)!"), "q1q2-2024");
        assert_eq!(sanitize_folder_name("a_b"), "a_b");
    }

    #[test]
    fn test_folder_name_collapses_and_trims_hyphens() {
        assert_eq!(sanitize_folder_name("  --weird --  name--  "), "weird-name");
        assert_eq!(sanitize_folder_name("---"), "");
    }

    #[test]
    fn test_file_name_keeps_case_and_extension() {
        assert_eq!(sanitize_file_name("Statement 2024.pdf"), "Statement_2024.pdf");
        assert_eq!(sanitize_file_name("a.pdf"), "a.pdf");
    }

    #[test]
    fn test_file_name_collapses_invalid_runs() {
        assert_eq!(sanitize_file_name("foo??!!bar.txt"), "foo_bar.txt");
        assert_eq!(sanitize_file_name("__lead_trail__"), "lead_trail");
    }
}
