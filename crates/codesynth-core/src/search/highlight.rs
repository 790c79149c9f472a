//! Case-insensitive substring matching over Unicode text.
//!
//! Matching folds each character with `char::to_lowercase`, so reported spans are
//! byte ranges into the original text and always fall on char boundaries.

use std::ops::Range;

/// Finds non-overlapping, leftmost matches of `query` in `text`.
pub fn match_spans(text: &str, query: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    if query.is_empty() {
        return spans;
    }

    let mut start = 0;
    while start < text.len() {
        match match_len_at(&text[start..], query) {
            Some(len) => {
                spans.push(start..start + len);
                start += len;
            }
            None => {
                start += text[start..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    spans
}

/// True when `text` contains `query`, ignoring case. The empty query matches.
pub fn contains_ignore_case(text: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    text.char_indices()
        .any(|(i, _)| match_len_at(&text[i..], query).is_some())
}

/// Byte length of the match when `haystack` starts with `query` ignoring case.
fn match_len_at(haystack: &str, query: &str) -> Option<usize> {
    let mut hay = haystack.char_indices();
    for q in query.chars() {
        let (_, h) = hay.next()?;
        if !h.to_lowercase().eq(q.to_lowercase()) {
            return None;
        }
    }
    Some(hay.next().map_or(haystack.len(), |(i, _)| i))
}
