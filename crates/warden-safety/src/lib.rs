//! Text-level defenses for untrusted GitHub and ticket content.
//!
//! Inbound content goes through [`sanitize_content`], an ordered chain of
//! pure rewrites that strips hidden-instruction vectors and redacts
//! credential-shaped tokens. Agent output goes through
//! [`sanitize_agent_output`] before it is posted back. The whole-token
//! phrase matcher used by the trigger detector lives here too, so the
//! egress sanitizer and the detector can never disagree about what counts
//! as a mention.

pub mod egress;
pub mod phrase_match;
pub mod sanitizer;
pub mod status_marker;
pub mod token_redaction;

pub use egress::{sanitize_agent_output, NEUTRAL_TRIGGER_REPLACEMENT};
pub use phrase_match::{contains_whole_token, replace_whole_token, whole_token_spans};
pub use sanitizer::{
    normalize_html_entities, sanitize_content, sanitize_optional, strip_hidden_attributes,
    strip_html_comments, strip_invisible_characters, strip_markdown_image_alt_text,
    strip_markdown_link_titles, SanitizeStep, INBOUND_SANITIZE_STEPS,
};
pub use status_marker::{
    append_status_marker, contains_status_marker, status_marker, strip_status_markers,
};
pub use token_redaction::{redact_github_tokens, REDACTED_TOKEN_PLACEHOLDER};
