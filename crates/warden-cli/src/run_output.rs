//! Runner output emission.
//!
//! Values go to the `GITHUB_OUTPUT` file in the multi-line delimiter form
//! (`name<<DELIM\nvalue\nDELIM`) so JSON payloads with newlines survive.
//! Without an output file a single JSON object is printed to stdout.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use warden_core::current_unix_timestamp_ms;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct RunOutputs {
    pub(crate) should_run: bool,
    pub(crate) task_payload: Option<String>,
    pub(crate) secondary_intents: Vec<String>,
    pub(crate) skip_reason: Option<String>,
}

impl RunOutputs {
    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![("should_run", self.should_run.to_string())];
        if let Some(payload) = &self.task_payload {
            entries.push(("task_payload", payload.clone()));
        }
        entries.push(("secondary_intents", self.secondary_intents.join(",")));
        if let Some(reason) = &self.skip_reason {
            entries.push(("skip_reason", reason.clone()));
        }
        entries
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        json!({
            "should_run": self.should_run,
            "task_payload": self.task_payload,
            "secondary_intents": self.secondary_intents,
            "skip_reason": self.skip_reason,
        })
    }
}

fn delimiter_for(value: &str, seed: u64) -> String {
    let mut salt = seed;
    loop {
        let candidate = format!("WARDEN_EOF_{salt:x}");
        if !value.lines().any(|line| line == candidate) {
            return candidate;
        }
        salt = salt.wrapping_add(1);
    }
}

pub(crate) fn render_github_output(outputs: &RunOutputs, seed: u64) -> String {
    let mut rendered = String::new();
    for (name, value) in outputs.entries() {
        let delimiter = delimiter_for(&value, seed);
        rendered.push_str(&format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"));
    }
    rendered
}

/// Appends to `output_file` when set, otherwise prints JSON on stdout.
pub(crate) fn write_outputs(outputs: &RunOutputs, output_file: Option<&Path>) -> Result<()> {
    let Some(path) = output_file else {
        println!("{}", outputs.to_json());
        return Ok(());
    };
    let rendered = render_github_output(outputs, current_unix_timestamp_ms());
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open output file {}", path.display()))?;
    file.write_all(rendered.as_bytes())
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{render_github_output, write_outputs, RunOutputs};

    #[test]
    fn unit_render_uses_delimiter_form_for_every_value() {
        let outputs = RunOutputs {
            should_run: true,
            task_payload: Some("{\"task\":\"line one\\nline two\"}".to_string()),
            secondary_intents: vec!["fix_ci".to_string(), "minor_fix".to_string()],
            skip_reason: None,
        };
        let rendered = render_github_output(&outputs, 0xabc);
        assert_eq!(
            rendered,
            "should_run<<WARDEN_EOF_abc\ntrue\nWARDEN_EOF_abc\n\
             task_payload<<WARDEN_EOF_abc\n{\"task\":\"line one\\nline two\"}\nWARDEN_EOF_abc\n\
             secondary_intents<<WARDEN_EOF_abc\nfix_ci,minor_fix\nWARDEN_EOF_abc\n"
        );
    }

    #[test]
    fn regression_delimiter_never_collides_with_value_line() {
        let outputs = RunOutputs {
            should_run: true,
            task_payload: Some("before\nWARDEN_EOF_1\nafter".to_string()),
            ..RunOutputs::default()
        };
        let rendered = render_github_output(&outputs, 1);
        assert!(rendered.contains("task_payload<<WARDEN_EOF_2\n"));
        assert!(rendered.contains("\nafter\nWARDEN_EOF_2\n"));
    }

    #[test]
    fn functional_write_outputs_appends_to_existing_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("github_output");
        std::fs::write(&path, "previous=1\n").expect("seed");
        let outputs = RunOutputs {
            should_run: false,
            skip_reason: Some("no trigger".to_string()),
            ..RunOutputs::default()
        };
        write_outputs(&outputs, Some(&path)).expect("write");
        let written = std::fs::read_to_string(&path).expect("read");
        assert!(written.starts_with("previous=1\n"));
        assert!(written.contains("should_run<<"));
        assert!(written.contains("\nfalse\n"));
        assert!(written.contains("\nno trigger\n"));
        assert!(!written.contains("task_payload"));
    }

    #[test]
    fn unit_json_fallback_shape() {
        let outputs = RunOutputs {
            should_run: true,
            task_payload: Some("{}".to_string()),
            secondary_intents: vec!["code_review".to_string()],
            skip_reason: None,
        };
        let value = outputs.to_json();
        assert_eq!(value["should_run"], true);
        assert_eq!(value["secondary_intents"][0], "code_review");
        assert!(value["skip_reason"].is_null());
    }
}
