//! Small lexical helpers shared by the segment, key-predicate and
//! skip-token parsers. OData quotes strings with single quotes and
//! escapes an embedded quote by doubling it, so every splitter here has
//! to carry quote state.

/// Split `input` on `separator`, ignoring separators inside quoted
/// literals. Doubled quotes stay inside the quoted run.
pub(crate) fn split_outside_quotes(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut in_quotes = false;
    for (idx, ch) in input.char_indices() {
        match ch {
            '\'' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Byte offset of the first unquoted occurrence of `needle`.
pub(crate) fn find_outside_quotes(input: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, ch) in input.char_indices() {
        match ch {
            '\'' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}
