#![no_main]

use libfuzzer_sys::fuzz_target;
use warden_safety::{contains_whole_token, replace_whole_token, whole_token_spans};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let (phrase, text) = match raw.split_once('\n') {
        Some((phrase, text)) if !phrase.trim().is_empty() => (phrase.trim(), text),
        _ => ("@junie-agent", &*raw),
    };

    let spans = whole_token_spans(phrase, text);
    assert_eq!(contains_whole_token(phrase, text), !spans.is_empty());
    let mut previous_end = 0;
    for span in &spans {
        assert!(span.start >= previous_end);
        assert!(text.is_char_boundary(span.start) && text.is_char_boundary(span.end));
        previous_end = span.end;
    }

    let replacement = "the agent";
    let replaced = replace_whole_token(phrase, text, replacement);
    let matched_bytes: usize = spans.iter().map(|span| span.len()).sum();
    assert_eq!(
        replaced.len(),
        text.len() - matched_bytes + spans.len() * replacement.len()
    );
});
