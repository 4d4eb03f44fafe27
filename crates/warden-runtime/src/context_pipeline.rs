//! Orchestrates one run: trigger check, fetch, time fence, attachment
//! localization, sanitization and prompt formatting, strictly in that
//! order.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};
use warden_events::{
    detect_secondary_intents, evaluate_trigger, DispatchAction, EntityRef, EventPayload,
    ExecutionContext, RunDecision, SecondaryIntent, SkipReason, TicketPayload,
};
use warden_github::{
    poll_mergeable_state, AttachmentResolver, EntityFetcher, FetchedEntity, MergeOutcome,
    MergePollConfig, TicketAttachmentResolver, TimeFence, TimelineItem,
};
use warden_safety::sanitize_content;

use crate::prompt_formatter::{
    format_entity_prompt, format_prompt_only, format_ticket_prompt, CODE_REVIEW_INSTRUCTION,
};
use crate::task_payload::TaskPayload;

pub const DEFAULT_ATTACHMENT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    Trigger(SkipReason),
    /// Resolve-conflicts dispatch on a branch that already merges cleanly.
    AlreadyMergeable,
    /// Mergeability stayed unknown for the whole polling budget.
    MergeabilityUnknown,
}

impl SkipCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger(reason) => reason.as_str(),
            Self::AlreadyMergeable => "pull request has no merge conflicts",
            Self::MergeabilityUnknown => "pull request mergeable state never resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedTask {
    pub payload: TaskPayload,
    pub secondary_intents: Vec<SecondaryIntent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Emitted(EmittedTask),
    Skipped(SkipCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Public struct `PipelineSettings` used across Warden components.
pub struct PipelineSettings {
    pub attachment_concurrency: usize,
    pub merge_poll: MergePollConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            attachment_concurrency: DEFAULT_ATTACHMENT_CONCURRENCY,
            merge_poll: MergePollConfig::default(),
        }
    }
}

pub struct ContextPipeline {
    fetcher: Arc<dyn EntityFetcher>,
    attachments: AttachmentResolver,
    ticket_attachments: Option<TicketAttachmentResolver>,
    settings: PipelineSettings,
}

/// `(rendered_html, markdown)` pairs in a fixed walk order. The same
/// order is used to write localized text back.
fn attachment_sources(entity: &FetchedEntity) -> Vec<(String, String)> {
    let mut sources = Vec::new();
    if entity.body_safe {
        sources.push((entity.body_html.clone(), entity.body.clone()));
    }
    for item in &entity.timeline {
        if let TimelineItem::Comment(comment) = item {
            sources.push((comment.body_html.clone(), comment.body.clone()));
        }
    }
    for review in &entity.reviews {
        sources.push((review.body_html.clone(), review.body.clone()));
        for comment in &review.comments {
            sources.push((comment.body_html.clone(), comment.body.clone()));
        }
    }
    sources
}

fn apply_localized(entity: &mut FetchedEntity, localized: Vec<String>) {
    let mut localized = localized.into_iter();
    let mut next = |target: &mut String| {
        if let Some(text) = localized.next() {
            *target = text;
        }
    };
    if entity.body_safe {
        next(&mut entity.body);
    }
    for item in &mut entity.timeline {
        if let TimelineItem::Comment(comment) = item {
            next(&mut comment.body);
        }
    }
    for review in &mut entity.reviews {
        next(&mut review.body);
        for comment in &mut review.comments {
            next(&mut comment.body);
        }
    }
}

/// Sanitizes every text field that can reach the prompt. Rendered HTML is
/// dropped once attachments are localized.
pub fn sanitize_entity(entity: &mut FetchedEntity) {
    entity.title = sanitize_content(&entity.title);
    entity.body = if entity.body_safe {
        sanitize_content(&entity.body)
    } else {
        String::new()
    };
    entity.body_html.clear();
    for item in &mut entity.timeline {
        match item {
            TimelineItem::Comment(comment) => {
                comment.body = sanitize_content(&comment.body);
                comment.body_html.clear();
            }
            TimelineItem::CrossReference { source, .. } => {
                source.title = sanitize_content(&source.title);
            }
            TimelineItem::CommitReference {
                message_headline, ..
            } => {
                *message_headline = sanitize_content(message_headline);
            }
        }
    }
    for review in &mut entity.reviews {
        review.body = sanitize_content(&review.body);
        review.body_html.clear();
        for comment in &mut review.comments {
            comment.body = sanitize_content(&comment.body);
            comment.body_html.clear();
            comment.diff_hunk = sanitize_content(&comment.diff_hunk);
            comment.path = sanitize_content(&comment.path);
        }
    }
    for commit in &mut entity.commits {
        commit.headline = sanitize_content(&commit.headline);
        if let Some(author_name) = &mut commit.author_name {
            *author_name = sanitize_content(author_name);
        }
    }
    for file in &mut entity.files {
        file.path = sanitize_content(&file.path);
    }
    if let Some(pull_request) = &mut entity.pull_request {
        pull_request.head_branch = sanitize_content(&pull_request.head_branch);
        pull_request.base_branch = sanitize_content(&pull_request.base_branch);
    }
}

impl ContextPipeline {
    pub fn new(
        fetcher: Arc<dyn EntityFetcher>,
        attachments: AttachmentResolver,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            attachments,
            ticket_attachments: None,
            settings,
        }
    }

    pub fn with_ticket_attachments(mut self, resolver: TicketAttachmentResolver) -> Self {
        self.ticket_attachments = Some(resolver);
        self
    }

    pub async fn run(&self, context: &ExecutionContext) -> Result<PipelineOutcome> {
        if let RunDecision::Skip(reason) = evaluate_trigger(context) {
            info!(reason = reason.as_str(), "skipping run");
            return Ok(PipelineOutcome::Skipped(SkipCause::Trigger(reason)));
        }
        let intents = detect_secondary_intents(context);
        if !intents.is_empty() {
            info!(?intents, "secondary intents requested");
        }
        let forced_prompt = context.inputs().forced_prompt();

        let payload = match context.payload() {
            EventPayload::WorkflowDispatch(dispatch) => match &dispatch.action {
                DispatchAction::ResolveConflicts {
                    pull_request_number,
                } => return Ok(self.resolve_conflicts(context, *pull_request_number).await),
                DispatchAction::CodeReview {
                    pull_request_number,
                } => {
                    let entity = EntityRef {
                        number: *pull_request_number,
                        is_pull_request: true,
                    };
                    let instruction = forced_prompt.unwrap_or(CODE_REVIEW_INSTRUCTION);
                    let entity = self.assemble_entity(context, entity).await?;
                    TaskPayload::Task(format_entity_prompt(
                        context,
                        &entity,
                        Some(instruction),
                        &intents,
                    ))
                }
                DispatchAction::Ticket(ticket) => {
                    let ticket = self.localize_ticket(ticket).await;
                    TaskPayload::Task(format_ticket_prompt(context, &ticket, forced_prompt))
                }
                DispatchAction::Prompt => self.default_task(context, forced_prompt, &intents).await?,
            },
            _ => self.default_task(context, forced_prompt, &intents).await?,
        };
        Ok(PipelineOutcome::Emitted(EmittedTask {
            payload,
            secondary_intents: intents,
        }))
    }

    async fn default_task(
        &self,
        context: &ExecutionContext,
        forced_prompt: Option<&str>,
        intents: &[SecondaryIntent],
    ) -> Result<TaskPayload> {
        if let Some(prompt) = forced_prompt {
            if !context.inputs().attach_github_context {
                return Ok(TaskPayload::Task(format_prompt_only(context, prompt)));
            }
        }
        match context.entity() {
            Some(entity) => {
                let entity = self.assemble_entity(context, entity).await?;
                Ok(TaskPayload::Task(format_entity_prompt(
                    context,
                    &entity,
                    forced_prompt,
                    intents,
                )))
            }
            None => {
                let prompt = forced_prompt.with_context(|| {
                    format!(
                        "{} event carries no issue or pull request and no prompt was configured",
                        context.kind().as_str()
                    )
                })?;
                Ok(TaskPayload::Task(format_prompt_only(context, prompt)))
            }
        }
    }

    /// Fetch → fence → localize → sanitize for one issue or pull request.
    pub async fn assemble_entity(
        &self,
        context: &ExecutionContext,
        entity: EntityRef,
    ) -> Result<FetchedEntity> {
        let repository = context.repository();
        let mut fetched = self
            .fetcher
            .fetch(repository, entity)
            .await
            .with_context(|| {
                format!(
                    "failed to fetch {} #{} from {}",
                    if entity.is_pull_request {
                        "pull request"
                    } else {
                        "issue"
                    },
                    entity.number,
                    repository.slug()
                )
            })?;

        TimeFence::new(context.trigger_time()).apply(&mut fetched);

        let sources = attachment_sources(&fetched);
        let localized = stream::iter(sources)
            .map(|(html, body)| async move { self.attachments.resolve(&html, &body).await })
            .buffered(self.settings.attachment_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        apply_localized(&mut fetched, localized);

        sanitize_entity(&mut fetched);
        Ok(fetched)
    }

    async fn localize_ticket(&self, ticket: &TicketPayload) -> TicketPayload {
        let mut localized = ticket.clone();
        if let Some(resolver) = &self.ticket_attachments {
            let mut texts = vec![ticket.description.as_str()];
            texts.extend(ticket.comments.iter().map(|comment| comment.body.as_str()));
            let mut resolved = resolver
                .resolve_all(&texts, &ticket.attachments)
                .await
                .into_iter();
            if let Some(description) = resolved.next() {
                localized.description = description;
            }
            for (comment, body) in localized.comments.iter_mut().zip(resolved) {
                comment.body = body;
            }
        }
        localized.summary = sanitize_content(&localized.summary);
        localized.description = sanitize_content(&localized.description);
        for comment in &mut localized.comments {
            comment.author = sanitize_content(&comment.author);
            comment.body = sanitize_content(&comment.body);
        }
        localized
    }

    async fn resolve_conflicts(&self, context: &ExecutionContext, number: u64) -> PipelineOutcome {
        let outcome = poll_mergeable_state(
            self.fetcher.as_ref(),
            context.repository(),
            number,
            self.settings.merge_poll,
        )
        .await;
        match outcome {
            MergeOutcome::Dispatch { head_branch } => PipelineOutcome::Emitted(EmittedTask {
                payload: TaskPayload::merge(head_branch),
                secondary_intents: vec![SecondaryIntent::ResolveConflicts],
            }),
            MergeOutcome::NothingToDo => PipelineOutcome::Skipped(SkipCause::AlreadyMergeable),
            MergeOutcome::GaveUp => {
                warn!(number, "giving up on conflict resolution");
                PipelineOutcome::Skipped(SkipCause::MergeabilityUnknown)
            }
        }
    }
}
