//! Redaction of GitHub credential shapes.

use std::sync::OnceLock;

use aho_corasick::AhoCorasick;
use regex::Regex;

pub const REDACTED_TOKEN_PLACEHOLDER: &str = "[REDACTED_GITHUB_TOKEN]";

/// Prefixes of every token shape handled below. Used as a cheap prefilter so
/// the common case (no token at all) skips the regex pass.
const TOKEN_PREFIXES: &[&str] = &["ghp_", "gho_", "ghs_", "ghr_", "github_pat_"];

fn token_prefix_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| AhoCorasick::new(TOKEN_PREFIXES).expect("valid token prefixes"))
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:ghp|gho|ghs|ghr)_[A-Za-z0-9]{36}|github_pat_[A-Za-z0-9_]{11,221}")
            .expect("valid regex")
    })
}

/// Replaces classic (`ghp_`, `gho_`, `ghs_`, `ghr_`) and fine-grained
/// (`github_pat_`) tokens with [`REDACTED_TOKEN_PLACEHOLDER`].
pub fn redact_github_tokens(text: &str) -> String {
    if !token_prefix_matcher().is_match(text) {
        return text.to_string();
    }
    token_pattern()
        .replace_all(text, REDACTED_TOKEN_PLACEHOLDER)
        .into_owned()
}
