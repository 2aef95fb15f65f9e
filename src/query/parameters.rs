//! Bind-parameter placeholder detection.

use std::sync::OnceLock;

use regex::Regex;

/// Matches spans where a `?` is not a placeholder: quoted literals and
/// identifiers, and line or block comments.
fn non_code_spans() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|--[^\n]*|/\*(?s:.*?)\*/"#)
            .expect("placeholder pattern is valid")
    })
}

/// Counts positional `?` placeholders in a statement.
pub fn placeholder_count(sql: &str) -> usize {
    non_code_spans()
        .replace_all(sql, " ")
        .chars()
        .filter(|c| *c == '?')
        .count()
}

/// Returns true if the statement takes bind parameters.
pub fn is_parameterized(sql: &str) -> bool {
    placeholder_count(sql) > 0
}
