//! Sanitizer for text the agent produced, applied right before it is posted
//! back to the platform.

use crate::phrase_match::replace_whole_token;
use crate::token_redaction::redact_github_tokens;

/// Stand-in for the trigger phrase inside agent output.
pub const NEUTRAL_TRIGGER_REPLACEMENT: &str = "the agent";

/// Redacts tokens and neutralizes whole-token mentions of `trigger_phrase`
/// so a posted response cannot re-trigger this or another agent instance.
pub fn sanitize_agent_output(text: &str, trigger_phrase: &str) -> String {
    let redacted = redact_github_tokens(text);
    let phrase = trigger_phrase.trim();
    if phrase.is_empty() {
        return redacted;
    }
    replace_whole_token(phrase, &redacted, NEUTRAL_TRIGGER_REPLACEMENT)
}
