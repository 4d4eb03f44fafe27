use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use warden_events::{DEFAULT_TRIGGER_LABEL, DEFAULT_TRIGGER_PHRASE};
use warden_github::{DEFAULT_ATTACHMENT_MAX_BYTES, DEFAULT_GRAPHQL_URL};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "warden",
    version,
    about = "Assembles a trusted task payload for the coding agent from a GitHub event"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: WardenCommand,
}

#[derive(Debug, Subcommand)]
pub enum WardenCommand {
    /// Resolve the event, gather context and emit the task payload.
    Prepare(PrepareArgs),
    /// Sanitize agent output read from stdin before it is posted back.
    SanitizeOutput(SanitizeOutputArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TriggerArgs {
    #[arg(
        long = "trigger-phrase",
        env = "WARDEN_TRIGGER_PHRASE",
        default_value = DEFAULT_TRIGGER_PHRASE,
        help = "Phrase that triggers the agent when it appears as a whole token"
    )]
    pub trigger_phrase: String,

    #[arg(
        long = "trigger-label",
        env = "WARDEN_TRIGGER_LABEL",
        default_value = DEFAULT_TRIGGER_LABEL,
        help = "Label that triggers the agent when applied"
    )]
    pub trigger_label: String,

    #[arg(
        long = "trigger-assignee",
        env = "WARDEN_TRIGGER_ASSIGNEE",
        help = "Login that triggers the agent when assigned (defaults to the trigger phrase)"
    )]
    pub trigger_assignee: Option<String>,

    #[arg(
        long = "prompt",
        env = "WARDEN_PROMPT",
        help = "Explicit task prompt; forces a run"
    )]
    pub prompt: Option<String>,

    #[arg(
        long = "attach-github-context",
        env = "WARDEN_ATTACH_GITHUB_CONTEXT",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Include issue/PR context alongside an explicit prompt"
    )]
    pub attach_github_context: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PrepareArgs {
    #[arg(long = "event-name", env = "GITHUB_EVENT_NAME")]
    pub event_name: String,

    #[arg(long = "event-path", env = "GITHUB_EVENT_PATH")]
    pub event_path: PathBuf,

    #[arg(
        long = "repository",
        env = "GITHUB_REPOSITORY",
        help = "owner/repo fallback for events without a repository object"
    )]
    pub repository: Option<String>,

    #[arg(long = "actor", env = "GITHUB_ACTOR", default_value = "")]
    pub actor: String,

    #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(
        long = "graphql-url",
        env = "GITHUB_GRAPHQL_URL",
        default_value = DEFAULT_GRAPHQL_URL
    )]
    pub graphql_url: String,

    #[arg(
        long = "output-file",
        env = "GITHUB_OUTPUT",
        help = "Runner output file; stdout is used when unset"
    )]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub trigger: TriggerArgs,

    #[arg(
        long = "attachments-dir",
        env = "WARDEN_ATTACHMENTS_DIR",
        default_value = ".warden/attachments"
    )]
    pub attachments_dir: PathBuf,

    #[arg(
        long = "request-timeout-ms",
        env = "WARDEN_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "WARDEN_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-min-delay-ms",
        env = "WARDEN_RETRY_MIN_DELAY_MS",
        default_value_t = 1_000
    )]
    pub retry_min_delay_ms: u64,

    #[arg(
        long = "retry-max-delay-ms",
        env = "WARDEN_RETRY_MAX_DELAY_MS",
        default_value_t = 5_000
    )]
    pub retry_max_delay_ms: u64,

    #[arg(
        long = "attachment-max-bytes",
        env = "WARDEN_ATTACHMENT_MAX_BYTES",
        default_value_t = DEFAULT_ATTACHMENT_MAX_BYTES,
        value_parser = parse_positive_usize
    )]
    pub attachment_max_bytes: usize,

    #[arg(
        long = "attachment-concurrency",
        env = "WARDEN_ATTACHMENT_CONCURRENCY",
        default_value_t = 4,
        value_parser = parse_positive_usize
    )]
    pub attachment_concurrency: usize,

    #[arg(
        long = "merge-poll-attempts",
        env = "WARDEN_MERGE_POLL_ATTEMPTS",
        default_value_t = 5,
        value_parser = parse_positive_usize
    )]
    pub merge_poll_attempts: usize,

    #[arg(
        long = "merge-poll-interval-ms",
        env = "WARDEN_MERGE_POLL_INTERVAL_MS",
        default_value_t = 2_000
    )]
    pub merge_poll_interval_ms: u64,

    #[arg(
        long = "ticket-tracker-token",
        env = "WARDEN_TICKET_TRACKER_TOKEN",
        hide_env_values = true
    )]
    pub ticket_tracker_token: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SanitizeOutputArgs {
    #[arg(
        long = "trigger-phrase",
        env = "WARDEN_TRIGGER_PHRASE",
        default_value = DEFAULT_TRIGGER_PHRASE
    )]
    pub trigger_phrase: String,

    #[arg(long = "workflow", env = "GITHUB_WORKFLOW")]
    pub workflow: Option<String>,

    #[arg(long = "run-id", env = "GITHUB_RUN_ID")]
    pub run_id: Option<String>,

    #[arg(
        long = "status-marker",
        env = "WARDEN_STATUS_MARKER",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Append the workflow status marker to the sanitized text"
    )]
    pub status_marker: bool,
}
