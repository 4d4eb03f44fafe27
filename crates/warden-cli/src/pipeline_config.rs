use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use warden_events::{RunnerIdentity, UserInputs};
use warden_github::{GithubClientConfig, MergePollConfig, RetryPolicy};
use warden_runtime::PipelineSettings;

use crate::cli_args::PrepareArgs;

#[derive(Debug, Clone)]
/// Run configuration derived once from CLI flags and runner environment.
/// Nothing downstream reads the environment again.
pub(crate) struct PipelineConfig {
    pub(crate) event_name: String,
    pub(crate) event_path: PathBuf,
    pub(crate) output_file: Option<PathBuf>,
    pub(crate) identity: RunnerIdentity,
    pub(crate) inputs: UserInputs,
    pub(crate) github: GithubClientConfig,
    pub(crate) attachments_dir: PathBuf,
    pub(crate) attachment_max_bytes: usize,
    pub(crate) ticket_tracker_token: Option<String>,
    pub(crate) settings: PipelineSettings,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl PipelineConfig {
    pub(crate) fn from_args(args: &PrepareArgs) -> Result<Self> {
        let Some(token) = non_empty(args.github_token.as_deref()) else {
            bail!("GITHUB_TOKEN (or --github-token) is required");
        };
        if args.trigger.trigger_phrase.trim().is_empty() {
            bail!("trigger phrase cannot be empty");
        }
        if args.retry_min_delay_ms > args.retry_max_delay_ms {
            bail!(
                "retry min delay ({}ms) exceeds retry max delay ({}ms)",
                args.retry_min_delay_ms,
                args.retry_max_delay_ms
            );
        }

        let github = GithubClientConfig {
            graphql_url: args.graphql_url.trim().to_string(),
            token,
            request_timeout_ms: args.request_timeout_ms,
            retry: RetryPolicy {
                max_attempts: args.retry_max_attempts,
                min_delay_ms: args.retry_min_delay_ms,
                max_delay_ms: args.retry_max_delay_ms,
            },
        };

        Ok(Self {
            event_name: args.event_name.trim().to_string(),
            event_path: args.event_path.clone(),
            output_file: args.output_file.clone(),
            identity: RunnerIdentity {
                actor: args.actor.trim().to_string(),
                token_login: None,
                repository_slug: non_empty(args.repository.as_deref()),
            },
            inputs: UserInputs {
                trigger_phrase: args.trigger.trigger_phrase.trim().to_string(),
                trigger_label: args.trigger.trigger_label.trim().to_string(),
                trigger_assignee: non_empty(args.trigger.trigger_assignee.as_deref()),
                prompt: non_empty(args.trigger.prompt.as_deref()),
                attach_github_context: args.trigger.attach_github_context,
            },
            github,
            attachments_dir: args.attachments_dir.clone(),
            attachment_max_bytes: args.attachment_max_bytes,
            ticket_tracker_token: non_empty(args.ticket_tracker_token.as_deref()),
            settings: PipelineSettings {
                attachment_concurrency: args.attachment_concurrency,
                merge_poll: MergePollConfig {
                    max_attempts: args.merge_poll_attempts,
                    interval: Duration::from_millis(args.merge_poll_interval_ms),
                },
            },
        })
    }
}
