//! Whole-token phrase matching.
//!
//! A phrase matches only when it is preceded by the start of the text or
//! whitespace, and followed by the end of the text, whitespace, or one of
//! `. , ! ? ; :`. `user@phrase.com` therefore never matches `@phrase`.

use std::ops::Range;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

fn is_leading_boundary(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .map_or(true, char::is_whitespace)
}

fn is_trailing_boundary(text: &str, end: usize) -> bool {
    text[end..]
        .chars()
        .next()
        .map_or(true, |ch| {
            ch.is_whitespace() || TRAILING_PUNCTUATION.contains(&ch)
        })
}

/// Byte ranges of every non-overlapping whole-token occurrence of `phrase`.
///
/// Every occurrence start is considered, including ones that overlap a
/// rejected candidate. Accepted spans never overlap each other.
pub fn whole_token_spans(phrase: &str, text: &str) -> Vec<Range<usize>> {
    if phrase.is_empty() {
        return Vec::new();
    }
    let mut spans = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find(phrase) {
        let start = cursor + offset;
        let end = start + phrase.len();
        if is_leading_boundary(text, start) && is_trailing_boundary(text, end) {
            spans.push(start..end);
            cursor = end;
        } else {
            cursor = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    spans
}

pub fn contains_whole_token(phrase: &str, text: &str) -> bool {
    !whole_token_spans(phrase, text).is_empty()
}

/// Replaces whole-token occurrences of `phrase`; partial-word occurrences
/// are left untouched.
pub fn replace_whole_token(phrase: &str, text: &str, replacement: &str) -> String {
    let spans = whole_token_spans(phrase, text);
    if spans.is_empty() {
        return text.to_string();
    }
    let mut rendered = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        rendered.push_str(&text[cursor..span.start]);
        rendered.push_str(replacement);
        cursor = span.end;
    }
    rendered.push_str(&text[cursor..]);
    rendered
}
