use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use tracing::warn;
use warden_safety::{
    append_status_marker, contains_status_marker, sanitize_agent_output, strip_status_markers,
};

use crate::cli_args::SanitizeOutputArgs;

pub(crate) fn render_sanitized_output(args: &SanitizeOutputArgs, raw: &str) -> Result<String> {
    let sanitized = sanitize_agent_output(raw, &args.trigger_phrase);
    if !args.status_marker {
        return Ok(sanitized);
    }
    let (Some(workflow), Some(run_id)) = (args.workflow.as_deref(), args.run_id.as_deref())
    else {
        bail!("--status-marker requires GITHUB_WORKFLOW and GITHUB_RUN_ID");
    };
    if contains_status_marker(&sanitized, workflow) {
        warn!(workflow, "agent output carried a status marker; replacing it");
    }
    let unmarked = strip_status_markers(&sanitized);
    Ok(append_status_marker(&unmarked, workflow, run_id))
}

pub(crate) fn run_sanitize_output(args: &SanitizeOutputArgs) -> Result<()> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read agent output from stdin")?;
    let rendered = render_sanitized_output(args, &raw)?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .context("failed to write sanitized output")?;
    stdout.flush().context("failed to flush sanitized output")
}
