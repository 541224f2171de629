//! String utilities for the domain layer.

/// Single-line preview of a (possibly long, multi-line) text.
///
/// Whitespace runs collapse to one space; the result is cut at a UTF-8
/// character boundary so that it stays within `max_len` bytes including
/// the trailing ellipsis.
pub fn preview(s: &str, max_len: usize) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() <= max_len {
        return collapsed;
    }
    let mut end = max_len.saturating_sub(3).min(collapsed.len());
    while end > 0 && !collapsed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &collapsed[..end])
}
