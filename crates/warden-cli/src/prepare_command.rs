use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};
use warden_events::{EventKind, ExecutionContext, RunnerIdentity};
use warden_github::{
    AttachmentFetch, AttachmentResolver, AttachmentStore, EntityFetcher, GithubGraphqlClient,
    HttpAttachmentFetcher, TicketAttachmentResolver, TicketTrackerClient,
};
use warden_runtime::{ContextPipeline, PipelineOutcome};

use crate::pipeline_config::PipelineConfig;
use crate::run_output::{write_outputs, RunOutputs};

fn read_event_payload(config: &PipelineConfig) -> Result<Value> {
    let raw = std::fs::read_to_string(&config.event_path).with_context(|| {
        format!(
            "failed to read event payload {}",
            config.event_path.display()
        )
    })?;
    serde_json::from_str(&raw).with_context(|| {
        format!(
            "failed to parse event payload {}",
            config.event_path.display()
        )
    })
}

/// Login lookup only feeds the self-trigger guard, so a failure downgrades
/// to a warning instead of aborting the run.
async fn resolve_token_login(fetcher: &dyn EntityFetcher) -> Option<String> {
    match fetcher.resolve_viewer_login().await {
        Ok(login) => {
            info!(login = %login, "resolved token login");
            Some(login)
        }
        Err(error) => {
            warn!(error = %error, "failed to resolve token login; self-trigger guard disabled");
            None
        }
    }
}

fn build_pipeline(
    config: &PipelineConfig,
    fetcher: Arc<dyn EntityFetcher>,
) -> Result<ContextPipeline> {
    let download_timeout_ms = config.github.request_timeout_ms;
    let attachments = AttachmentResolver::new(
        Arc::new(
            HttpAttachmentFetcher::new(download_timeout_ms, config.attachment_max_bytes)
                .context("failed to build attachment client")?,
        ),
        AttachmentStore::new(config.attachments_dir.clone()),
    );

    let ticket_fetcher: Arc<dyn AttachmentFetch> = match config.ticket_tracker_token.as_deref() {
        Some(token) => Arc::new(
            TicketTrackerClient::new(token, download_timeout_ms, config.attachment_max_bytes)
                .context("failed to build ticket tracker client")?,
        ),
        None => Arc::new(
            HttpAttachmentFetcher::new(download_timeout_ms, config.attachment_max_bytes)
                .context("failed to build attachment client")?,
        ),
    };
    let ticket_attachments = TicketAttachmentResolver::new(
        ticket_fetcher,
        AttachmentStore::new(config.attachments_dir.join("ticket")),
    );

    Ok(
        ContextPipeline::new(fetcher, attachments, config.settings)
            .with_ticket_attachments(ticket_attachments),
    )
}

pub(crate) fn outputs_for(outcome: &PipelineOutcome) -> Result<RunOutputs> {
    match outcome {
        PipelineOutcome::Emitted(task) => Ok(RunOutputs {
            should_run: true,
            task_payload: Some(
                task.payload
                    .to_json_string()
                    .context("failed to serialize task payload")?,
            ),
            secondary_intents: task
                .secondary_intents
                .iter()
                .map(|intent| intent.as_str().to_string())
                .collect(),
            skip_reason: None,
        }),
        PipelineOutcome::Skipped(cause) => Ok(RunOutputs {
            should_run: false,
            skip_reason: Some(cause.as_str().to_string()),
            ..RunOutputs::default()
        }),
    }
}

pub(crate) async fn run_prepare(config: PipelineConfig) -> Result<()> {
    // Fail on an unknown event before any network traffic.
    EventKind::parse(&config.event_name)?;
    let payload = read_event_payload(&config)?;

    let client = GithubGraphqlClient::new(config.github.clone())
        .context("failed to build GitHub client")?;
    let fetcher: Arc<dyn EntityFetcher> = Arc::new(client);
    let token_login = resolve_token_login(fetcher.as_ref()).await;

    let identity = RunnerIdentity {
        token_login,
        ..config.identity.clone()
    };
    let context = ExecutionContext::resolve(
        &config.event_name,
        &payload,
        identity,
        config.inputs.clone(),
    )
    .context("failed to resolve execution context")?;

    let pipeline = build_pipeline(&config, fetcher)?;
    let outcome = pipeline.run(&context).await?;
    let outputs = outputs_for(&outcome)?;
    if let Some(reason) = &outputs.skip_reason {
        eprintln!("warden: skipped: {reason}");
    }
    write_outputs(&outputs, config.output_file.as_deref())
}
