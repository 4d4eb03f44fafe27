//! Workflow-scoped hidden marker used to find "our own" status comment.
//!
//! The marker is an HTML comment, which [`crate::sanitize_content`] strips.
//! It must therefore only ever be appended to text that has already been
//! sanitized.

use std::sync::OnceLock;

use regex::Regex;

fn any_status_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<!--\s*warden-status:.*?-->").expect("valid regex"))
}

pub fn status_marker(workflow: &str, run_id: &str) -> String {
    format!(
        "<!-- warden-status:{}:{} -->",
        marker_component(workflow),
        marker_component(run_id)
    )
}

fn marker_component(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub fn append_status_marker(sanitized: &str, workflow: &str, run_id: &str) -> String {
    format!("{}\n\n{}", sanitized.trim_end(), status_marker(workflow, run_id))
}

/// Matches any run of the same workflow.
pub fn contains_status_marker(text: &str, workflow: &str) -> bool {
    let prefix = format!("<!-- warden-status:{}:", marker_component(workflow));
    text.contains(&prefix)
}

/// Removes every status marker, whatever its workflow or run, so only a
/// freshly appended marker can identify the posted comment.
pub fn strip_status_markers(text: &str) -> String {
    any_status_marker_pattern().replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::{
        append_status_marker, contains_status_marker, status_marker, strip_status_markers,
    };
    use crate::sanitize_content;

    #[test]
    fn unit_status_marker_escapes_unsafe_characters() {
        assert_eq!(
            status_marker("Junie CI -->", "42"),
            "<!-- warden-status:Junie_CI_--_:42 -->"
        );
    }

    #[test]
    fn functional_append_status_marker_survives_after_sanitization() {
        let body = sanitize_content("Working on it <!-- injected -->");
        let posted = append_status_marker(&body, "junie", "7");
        assert!(contains_status_marker(&posted, "junie"));
        assert!(!posted.contains("injected"));
    }

    #[test]
    fn regression_marker_is_stripped_when_sanitized_again() {
        let posted = append_status_marker("done", "junie", "7");
        assert!(!contains_status_marker(&sanitize_content(&posted), "junie"));
    }

    #[test]
    fn unit_strip_status_markers_removes_every_workflow_and_keeps_other_comments() {
        let text = "a <!-- warden-status:agent:1 --> b <!--warden-status:other:2--> <!-- note -->";
        assert_eq!(strip_status_markers(text), "a  b  <!-- note -->");
        assert!(!contains_status_marker(&strip_status_markers(text), "agent"));
    }
}
