//! Event context resolution.
//!
//! One resolver per [`EventKind`]; [`EventPayload`] is a closed union so a
//! new event kind is a compile error in every `match`, never a silent
//! default. `entity` and `trigger_time` are derived once during resolution
//! and the context is immutable afterwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use warden_core::parse_rfc3339_utc;

use crate::error::EventContextError;
use crate::payload::{
    RawCheckRun, RawCheckSuiteEvent, RawComment, RawEnvelope, RawIssueCommentEvent,
    RawIssuesEvent, RawPullRequest, RawPullRequestEvent, RawPushEvent,
    RawRepositoryDispatchEvent, RawReviewCommentEvent, RawReviewEvent, RawWorkflowDispatchEvent,
    RawWorkflowRunEvent,
};
use crate::ticket::{TicketAttachment, TicketComment, TicketPayload};

pub const DEFAULT_TRIGGER_PHRASE: &str = "@junie-agent";
pub const DEFAULT_TRIGGER_LABEL: &str = "junie";

const DISPATCH_ACTION_RESOLVE_CONFLICTS: &str = "resolve-conflicts";
const DISPATCH_ACTION_CODE_REVIEW: &str = "code-review";
const DISPATCH_ACTION_TICKET: &str = "ticket";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse_slug(raw: &str) -> Result<Self, EventContextError> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| EventContextError::InvalidRepository(trimmed.to_string()))?;
        if owner.trim().is_empty() || name.trim().is_empty() || name.contains('/') {
            return Err(EventContextError::InvalidRepository(trimmed.to_string()));
        }
        Ok(Self {
            owner: owner.trim().to_string(),
            name: name.trim().to_string(),
        })
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// User-supplied run configuration, read once at startup.
pub struct UserInputs {
    pub trigger_phrase: String,
    pub trigger_label: String,
    /// Falls back to the trigger phrase when unset.
    pub trigger_assignee: Option<String>,
    pub prompt: Option<String>,
    pub attach_github_context: bool,
}

impl Default for UserInputs {
    fn default() -> Self {
        Self {
            trigger_phrase: DEFAULT_TRIGGER_PHRASE.to_string(),
            trigger_label: DEFAULT_TRIGGER_LABEL.to_string(),
            trigger_assignee: None,
            prompt: None,
            attach_github_context: true,
        }
    }
}

impl UserInputs {
    /// Assignee handle compared against assignment events, without a leading `@`.
    pub fn effective_assignee(&self) -> &str {
        let raw = self
            .trigger_assignee
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.trigger_phrase.trim());
        raw.trim_start_matches('@')
    }

    pub fn forced_prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Who is running: the workflow actor, the login behind the acting token,
/// and the repository the runner reports.
pub struct RunnerIdentity {
    pub actor: String,
    pub token_login: Option<String>,
    pub repository_slug: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Issues,
    IssueComment,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Push,
    WorkflowDispatch,
    CheckSuite,
    WorkflowRun,
    Schedule,
    RepositoryDispatch,
}

impl EventKind {
    pub fn parse(raw: &str) -> Result<Self, EventContextError> {
        match raw.trim() {
            "issues" | "issue" => Ok(Self::Issues),
            "issue_comment" => Ok(Self::IssueComment),
            "pull_request" | "pull_request_target" => Ok(Self::PullRequest),
            "pull_request_review" => Ok(Self::PullRequestReview),
            "pull_request_review_comment" => Ok(Self::PullRequestReviewComment),
            "push" => Ok(Self::Push),
            "workflow_dispatch" => Ok(Self::WorkflowDispatch),
            "check_suite" => Ok(Self::CheckSuite),
            "workflow_run" => Ok(Self::WorkflowRun),
            "schedule" => Ok(Self::Schedule),
            "repository_dispatch" => Ok(Self::RepositoryDispatch),
            other => Err(EventContextError::UnrecognizedEvent(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::IssueComment => "issue_comment",
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::PullRequestReviewComment => "pull_request_review_comment",
            Self::Push => "push",
            Self::WorkflowDispatch => "workflow_dispatch",
            Self::CheckSuite => "check_suite",
            Self::WorkflowRun => "workflow_run",
            Self::Schedule => "schedule",
            Self::RepositoryDispatch => "repository_dispatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueEvent {
    pub action: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub is_pull_request: bool,
    pub assignee: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEvent {
    pub action: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub is_pull_request: bool,
    pub comment_id: u64,
    pub body: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub head_branch: String,
    pub base_branch: String,
    pub head_sha: Option<String>,
    pub assignee: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEvent {
    pub action: String,
    pub pull_request_number: u64,
    pub head_branch: String,
    pub review_id: u64,
    pub body: String,
    pub state: Option<String>,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCommentEvent {
    pub action: String,
    pub pull_request_number: u64,
    pub head_branch: String,
    pub comment_id: u64,
    pub body: String,
    pub author: String,
    pub path: Option<String>,
    pub in_reply_to: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub git_ref: String,
    pub head_sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Shared shape of `check_suite` and `workflow_run` payloads.
pub struct CheckRunEvent {
    pub action: String,
    pub name: Option<String>,
    pub conclusion: Option<String>,
    pub head_branch: Option<String>,
    pub head_sha: Option<String>,
    pub pull_request_numbers: Vec<u64>,
}

impl CheckRunEvent {
    pub fn is_failure(&self) -> bool {
        matches!(
            self.conclusion.as_deref(),
            Some("failure" | "timed_out" | "action_required")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    /// Plain dispatch; the run is driven by the configured prompt.
    Prompt,
    ResolveConflicts { pull_request_number: u64 },
    CodeReview { pull_request_number: u64 },
    Ticket(TicketPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDispatchEvent {
    pub action: DispatchAction,
    pub inputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryDispatchEvent {
    pub event_type: String,
    pub client_payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
/// Exactly one payload shape per event kind.
pub enum EventPayload {
    Issues(IssueEvent),
    IssueComment(CommentEvent),
    PullRequest(PullRequestEvent),
    PullRequestReview(ReviewEvent),
    PullRequestReviewComment(ReviewCommentEvent),
    Push(PushEvent),
    WorkflowDispatch(WorkflowDispatchEvent),
    CheckSuite(CheckRunEvent),
    WorkflowRun(CheckRunEvent),
    Schedule,
    RepositoryDispatch(RepositoryDispatchEvent),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Issues(_) => EventKind::Issues,
            Self::IssueComment(_) => EventKind::IssueComment,
            Self::PullRequest(_) => EventKind::PullRequest,
            Self::PullRequestReview(_) => EventKind::PullRequestReview,
            Self::PullRequestReviewComment(_) => EventKind::PullRequestReviewComment,
            Self::Push(_) => EventKind::Push,
            Self::WorkflowDispatch(_) => EventKind::WorkflowDispatch,
            Self::CheckSuite(_) => EventKind::CheckSuite,
            Self::WorkflowRun(_) => EventKind::WorkflowRun,
            Self::Schedule => EventKind::Schedule,
            Self::RepositoryDispatch(_) => EventKind::RepositoryDispatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Issue or pull request the run is about.
pub struct EntityRef {
    pub number: u64,
    pub is_pull_request: bool,
}

struct Resolved {
    payload: EventPayload,
    entity: Option<EntityRef>,
    trigger_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    repository: RepoRef,
    actor: String,
    token_login: Option<String>,
    entity: Option<EntityRef>,
    trigger_time: Option<DateTime<Utc>>,
    inputs: UserInputs,
    payload: EventPayload,
}

impl ExecutionContext {
    /// Resolves a raw event. An unrecognized `event_name` is fatal.
    pub fn resolve(
        event_name: &str,
        payload: &Value,
        identity: RunnerIdentity,
        inputs: UserInputs,
    ) -> Result<Self, EventContextError> {
        let kind = EventKind::parse(event_name)?;
        let repository = resolve_repository(kind, payload, identity.repository_slug.as_deref())?;
        let resolved = match kind {
            EventKind::Issues => resolve_issues(payload)?,
            EventKind::IssueComment => resolve_issue_comment(payload)?,
            EventKind::PullRequest => resolve_pull_request(payload)?,
            EventKind::PullRequestReview => resolve_review(payload)?,
            EventKind::PullRequestReviewComment => resolve_review_comment(payload)?,
            EventKind::Push => resolve_push(payload)?,
            EventKind::WorkflowDispatch => resolve_workflow_dispatch(payload)?,
            EventKind::CheckSuite => resolve_check_suite(payload)?,
            EventKind::WorkflowRun => resolve_workflow_run(payload)?,
            EventKind::Schedule => Resolved {
                payload: EventPayload::Schedule,
                entity: None,
                trigger_time: None,
            },
            EventKind::RepositoryDispatch => resolve_repository_dispatch(payload)?,
        };
        debug!(
            event = kind.as_str(),
            repository = %repository.slug(),
            entity = ?resolved.entity,
            trigger_time = ?resolved.trigger_time,
            "resolved execution context"
        );
        Ok(Self {
            repository,
            actor: identity.actor,
            token_login: identity.token_login,
            entity: resolved.entity,
            trigger_time: resolved.trigger_time,
            inputs,
            payload: resolved.payload,
        })
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn repository(&self) -> &RepoRef {
        &self.repository
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn token_login(&self) -> Option<&str> {
        self.token_login.as_deref()
    }

    pub fn entity(&self) -> Option<EntityRef> {
        self.entity
    }

    pub fn entity_number(&self) -> Option<u64> {
        self.entity.map(|entity| entity.number)
    }

    pub fn is_pull_request(&self) -> bool {
        self.entity.is_some_and(|entity| entity.is_pull_request)
    }

    /// Security boundary for the time fence. `None` means no single human
    /// trigger moment exists and all fetched content is trusted.
    pub fn trigger_time(&self) -> Option<DateTime<Utc>> {
        self.trigger_time
    }

    pub fn inputs(&self) -> &UserInputs {
        &self.inputs
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Body of the triggering comment, review or review comment.
    pub fn comment_body(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::IssueComment(event) => Some(event.body.as_str()),
            EventPayload::PullRequestReview(event) => Some(event.body.as_str()),
            EventPayload::PullRequestReviewComment(event) => Some(event.body.as_str()),
            _ => None,
        }
    }

    /// Automation supplied an explicit prompt or a dispatch action that
    /// carries its own intent.
    pub fn forced_intent(&self) -> bool {
        if self.inputs.forced_prompt().is_some() {
            return true;
        }
        matches!(
            &self.payload,
            EventPayload::WorkflowDispatch(WorkflowDispatchEvent {
                action: DispatchAction::ResolveConflicts { .. }
                    | DispatchAction::CodeReview { .. }
                    | DispatchAction::Ticket(_),
                ..
            })
        )
    }
}

fn decode<'a, T: Deserialize<'a>>(
    kind: EventKind,
    payload: &'a Value,
) -> Result<T, EventContextError> {
    T::deserialize(payload).map_err(|source| EventContextError::MalformedPayload {
        event: kind.as_str(),
        source,
    })
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, EventContextError> {
    parse_rfc3339_utc(value).map_err(|_| EventContextError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

fn resolve_repository(
    kind: EventKind,
    payload: &Value,
    fallback_slug: Option<&str>,
) -> Result<RepoRef, EventContextError> {
    let envelope: RawEnvelope = decode(kind, payload)?;
    if let Some(repository) = envelope.repository {
        return Ok(RepoRef {
            owner: repository.owner.login,
            name: repository.name,
        });
    }
    match fallback_slug.map(str::trim).filter(|slug| !slug.is_empty()) {
        Some(slug) => RepoRef::parse_slug(slug),
        None => Err(EventContextError::MissingRepository),
    }
}

fn resolve_issues(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawIssuesEvent = decode(EventKind::Issues, payload)?;
    let trigger_time = if raw.action == "opened" {
        parse_timestamp("issue.created_at", &raw.issue.created_at)?
    } else {
        parse_timestamp("issue.updated_at", &raw.issue.updated_at)?
    };
    let is_pull_request = raw.issue.pull_request.is_some();
    let entity = EntityRef {
        number: raw.issue.number,
        is_pull_request,
    };
    Ok(Resolved {
        payload: EventPayload::Issues(IssueEvent {
            action: raw.action,
            number: raw.issue.number,
            title: raw.issue.title,
            body: raw.issue.body.unwrap_or_default(),
            author: raw.issue.user.login,
            is_pull_request,
            assignee: raw.assignee.map(|user| user.login),
            label: raw.label.map(|label| label.name),
        }),
        entity: Some(entity),
        trigger_time: Some(trigger_time),
    })
}

fn comment_trigger_time(
    action: &str,
    comment: &RawComment,
) -> Result<DateTime<Utc>, EventContextError> {
    if action == "edited" {
        parse_timestamp("comment.updated_at", &comment.updated_at)
    } else {
        parse_timestamp("comment.created_at", &comment.created_at)
    }
}

fn resolve_issue_comment(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawIssueCommentEvent = decode(EventKind::IssueComment, payload)?;
    let trigger_time = comment_trigger_time(&raw.action, &raw.comment)?;
    let is_pull_request = raw.issue.pull_request.is_some();
    Ok(Resolved {
        entity: Some(EntityRef {
            number: raw.issue.number,
            is_pull_request,
        }),
        payload: EventPayload::IssueComment(CommentEvent {
            action: raw.action,
            issue_number: raw.issue.number,
            issue_title: raw.issue.title,
            is_pull_request,
            comment_id: raw.comment.id,
            body: raw.comment.body.unwrap_or_default(),
            author: raw.comment.user.login,
        }),
        trigger_time: Some(trigger_time),
    })
}

fn pull_request_entity(pull_request: &RawPullRequest) -> EntityRef {
    EntityRef {
        number: pull_request.number,
        is_pull_request: true,
    }
}

fn resolve_pull_request(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawPullRequestEvent = decode(EventKind::PullRequest, payload)?;
    let pull_request = raw.pull_request;
    let trigger_time = if raw.action == "opened" {
        parse_timestamp("pull_request.created_at", &pull_request.created_at)?
    } else {
        parse_timestamp("pull_request.updated_at", &pull_request.updated_at)?
    };
    Ok(Resolved {
        entity: Some(pull_request_entity(&pull_request)),
        payload: EventPayload::PullRequest(PullRequestEvent {
            action: raw.action,
            number: pull_request.number,
            title: pull_request.title,
            body: pull_request.body.unwrap_or_default(),
            author: pull_request.user.login,
            head_branch: pull_request.head.ref_name,
            base_branch: pull_request.base.ref_name,
            head_sha: pull_request.head.sha,
            assignee: raw.assignee.map(|user| user.login),
            label: raw.label.map(|label| label.name),
        }),
        trigger_time: Some(trigger_time),
    })
}

fn resolve_review(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawReviewEvent = decode(EventKind::PullRequestReview, payload)?;
    let trigger_time = match raw.review.submitted_at.as_deref() {
        Some(submitted_at) => parse_timestamp("review.submitted_at", submitted_at)?,
        None => parse_timestamp("pull_request.updated_at", &raw.pull_request.updated_at)?,
    };
    Ok(Resolved {
        entity: Some(pull_request_entity(&raw.pull_request)),
        payload: EventPayload::PullRequestReview(ReviewEvent {
            action: raw.action,
            pull_request_number: raw.pull_request.number,
            head_branch: raw.pull_request.head.ref_name,
            review_id: raw.review.id,
            body: raw.review.body.unwrap_or_default(),
            state: raw.review.state,
            author: raw.review.user.login,
        }),
        trigger_time: Some(trigger_time),
    })
}

fn resolve_review_comment(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawReviewCommentEvent = decode(EventKind::PullRequestReviewComment, payload)?;
    let trigger_time = comment_trigger_time(&raw.action, &raw.comment)?;
    Ok(Resolved {
        entity: Some(pull_request_entity(&raw.pull_request)),
        payload: EventPayload::PullRequestReviewComment(ReviewCommentEvent {
            action: raw.action,
            pull_request_number: raw.pull_request.number,
            head_branch: raw.pull_request.head.ref_name,
            comment_id: raw.comment.id,
            body: raw.comment.body.unwrap_or_default(),
            author: raw.comment.user.login,
            path: raw.comment.path,
            in_reply_to: raw.comment.in_reply_to_id,
        }),
        trigger_time: Some(trigger_time),
    })
}

fn resolve_push(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawPushEvent = decode(EventKind::Push, payload)?;
    Ok(Resolved {
        payload: EventPayload::Push(PushEvent {
            git_ref: raw.ref_name,
            head_sha: raw.after,
        }),
        entity: None,
        trigger_time: None,
    })
}

fn input_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn required_input<'a>(
    inputs: &'a BTreeMap<String, String>,
    action: &'static str,
    input: &'static str,
) -> Result<&'a str, EventContextError> {
    inputs
        .get(input)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(EventContextError::MissingDispatchInput { action, input })
}

fn pull_request_number_input(
    inputs: &BTreeMap<String, String>,
    action: &'static str,
) -> Result<u64, EventContextError> {
    let raw = required_input(inputs, action, "pr_number")?;
    raw.trim_start_matches('#')
        .parse::<u64>()
        .map_err(|error| EventContextError::InvalidDispatchInput {
            input: "pr_number",
            reason: error.to_string(),
        })
}

fn json_list_input<T: for<'de> Deserialize<'de>>(
    inputs: &BTreeMap<String, String>,
    input: &'static str,
) -> Result<Vec<T>, EventContextError> {
    match inputs
        .get(input)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
    {
        Some(raw) => serde_json::from_str(raw).map_err(|error| {
            EventContextError::InvalidDispatchInput {
                input,
                reason: error.to_string(),
            }
        }),
        None => Ok(Vec::new()),
    }
}

fn ticket_from_inputs(inputs: &BTreeMap<String, String>) -> Result<TicketPayload, EventContextError> {
    let key = required_input(inputs, DISPATCH_ACTION_TICKET, "ticket_key")?.to_string();
    let summary = required_input(inputs, DISPATCH_ACTION_TICKET, "ticket_summary")?.to_string();
    let description = inputs
        .get("ticket_description")
        .cloned()
        .unwrap_or_default();
    let comments: Vec<TicketComment> = json_list_input(inputs, "ticket_comments")?;
    let attachments: Vec<TicketAttachment> = json_list_input(inputs, "ticket_attachments")?;
    Ok(TicketPayload {
        key,
        summary,
        description,
        comments,
        attachments,
    })
}

fn dispatch_action_from_inputs(
    inputs: &BTreeMap<String, String>,
) -> Result<DispatchAction, EventContextError> {
    let action = inputs
        .get("action")
        .map(|value| value.trim())
        .unwrap_or_default();
    match action {
        "" => Ok(DispatchAction::Prompt),
        DISPATCH_ACTION_RESOLVE_CONFLICTS => Ok(DispatchAction::ResolveConflicts {
            pull_request_number: pull_request_number_input(
                inputs,
                DISPATCH_ACTION_RESOLVE_CONFLICTS,
            )?,
        }),
        DISPATCH_ACTION_CODE_REVIEW => Ok(DispatchAction::CodeReview {
            pull_request_number: pull_request_number_input(inputs, DISPATCH_ACTION_CODE_REVIEW)?,
        }),
        DISPATCH_ACTION_TICKET => Ok(DispatchAction::Ticket(ticket_from_inputs(inputs)?)),
        other => Err(EventContextError::UnknownDispatchAction(other.to_string())),
    }
}

fn resolve_workflow_dispatch(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawWorkflowDispatchEvent = decode(EventKind::WorkflowDispatch, payload)?;
    let inputs = raw
        .inputs
        .iter()
        .filter_map(|(key, value)| input_as_string(value).map(|value| (key.clone(), value)))
        .collect::<BTreeMap<_, _>>();
    let action = dispatch_action_from_inputs(&inputs)?;
    let entity = match &action {
        DispatchAction::ResolveConflicts {
            pull_request_number,
        }
        | DispatchAction::CodeReview {
            pull_request_number,
        } => Some(EntityRef {
            number: *pull_request_number,
            is_pull_request: true,
        }),
        DispatchAction::Prompt | DispatchAction::Ticket(_) => None,
    };
    Ok(Resolved {
        payload: EventPayload::WorkflowDispatch(WorkflowDispatchEvent { action, inputs }),
        entity,
        trigger_time: None,
    })
}

fn check_run_event(action: String, raw: RawCheckRun) -> CheckRunEvent {
    CheckRunEvent {
        action,
        name: raw.name,
        conclusion: raw.conclusion,
        head_branch: raw.head_branch,
        head_sha: raw.head_sha,
        pull_request_numbers: raw
            .pull_requests
            .into_iter()
            .map(|pull_request| pull_request.number)
            .collect(),
    }
}

fn first_pull_request(event: &CheckRunEvent) -> Option<EntityRef> {
    event.pull_request_numbers.first().map(|number| EntityRef {
        number: *number,
        is_pull_request: true,
    })
}

fn resolve_check_suite(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawCheckSuiteEvent = decode(EventKind::CheckSuite, payload)?;
    let event = check_run_event(raw.action, raw.check_suite);
    Ok(Resolved {
        entity: first_pull_request(&event),
        payload: EventPayload::CheckSuite(event),
        trigger_time: None,
    })
}

fn resolve_workflow_run(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawWorkflowRunEvent = decode(EventKind::WorkflowRun, payload)?;
    let event = check_run_event(raw.action, raw.workflow_run);
    Ok(Resolved {
        entity: first_pull_request(&event),
        payload: EventPayload::WorkflowRun(event),
        trigger_time: None,
    })
}

fn resolve_repository_dispatch(payload: &Value) -> Result<Resolved, EventContextError> {
    let raw: RawRepositoryDispatchEvent = decode(EventKind::RepositoryDispatch, payload)?;
    Ok(Resolved {
        payload: EventPayload::RepositoryDispatch(RepositoryDispatchEvent {
            event_type: raw.action,
            client_payload: raw.client_payload,
        }),
        entity: None,
        trigger_time: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use warden_core::parse_rfc3339_utc;

    use super::{
        DispatchAction, EntityRef, EventKind, EventPayload, ExecutionContext, RepoRef,
        RunnerIdentity, UserInputs,
    };
    use crate::error::EventContextError;

    fn repository() -> Value {
        json!({ "name": "repo", "owner": { "login": "owner" } })
    }

    fn identity() -> RunnerIdentity {
        RunnerIdentity {
            actor: "alice".to_string(),
            token_login: Some("junie-bot".to_string()),
            repository_slug: None,
        }
    }

    fn resolve(event: &str, payload: Value) -> Result<ExecutionContext, EventContextError> {
        ExecutionContext::resolve(event, &payload, identity(), UserInputs::default())
    }

    fn issue_comment_payload(action: &str, on_pull_request: bool) -> Value {
        let mut issue = json!({
            "number": 42,
            "title": "Crash on start",
            "body": "boom",
            "user": { "login": "bob" },
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:05:00Z"
        });
        if on_pull_request {
            issue["pull_request"] = json!({ "url": "https://api.github.com/repos/owner/repo/pulls/42" });
        }
        json!({
            "action": action,
            "issue": issue,
            "comment": {
                "id": 7,
                "body": "@junie-agent please fix",
                "user": { "login": "alice" },
                "created_at": "2026-01-01T00:01:00Z",
                "updated_at": "2026-01-01T00:03:00Z"
            },
            "repository": repository()
        })
    }

    #[test]
    fn unit_event_kind_parse_rejects_unknown_kinds() {
        assert_eq!(EventKind::parse("issues").expect("issues"), EventKind::Issues);
        let error = EventKind::parse("deployment").expect_err("unknown");
        assert!(matches!(error, EventContextError::UnrecognizedEvent(name) if name == "deployment"));
    }

    #[test]
    fn unit_repo_ref_parse_slug_requires_owner_and_name() {
        assert_eq!(
            RepoRef::parse_slug("owner/repo").expect("slug"),
            RepoRef {
                owner: "owner".to_string(),
                name: "repo".to_string()
            }
        );
        assert!(RepoRef::parse_slug("owner").is_err());
        assert!(RepoRef::parse_slug("owner/repo/extra").is_err());
    }

    #[test]
    fn unit_user_inputs_effective_assignee_strips_leading_at() {
        let inputs = UserInputs::default();
        assert_eq!(inputs.effective_assignee(), "junie-agent");
        let configured = UserInputs {
            trigger_assignee: Some("@reviewer-bot".to_string()),
            ..UserInputs::default()
        };
        assert_eq!(configured.effective_assignee(), "reviewer-bot");
    }

    #[test]
    fn functional_issue_comment_on_pull_request_sets_pr_flag_and_trigger_time() {
        let context = resolve("issue_comment", issue_comment_payload("created", true))
            .expect("context");
        assert_eq!(context.kind(), EventKind::IssueComment);
        assert_eq!(
            context.entity(),
            Some(EntityRef {
                number: 42,
                is_pull_request: true
            })
        );
        assert_eq!(
            context.trigger_time(),
            Some(parse_rfc3339_utc("2026-01-01T00:01:00Z").expect("time"))
        );
        assert_eq!(context.comment_body(), Some("@junie-agent please fix"));
        assert_eq!(context.repository().slug(), "owner/repo");
    }

    #[test]
    fn functional_edited_comment_uses_edit_time_as_trigger_time() {
        let context =
            resolve("issue_comment", issue_comment_payload("edited", false)).expect("context");
        assert!(!context.is_pull_request());
        assert_eq!(
            context.trigger_time(),
            Some(parse_rfc3339_utc("2026-01-01T00:03:00Z").expect("time"))
        );
    }

    #[test]
    fn functional_workflow_dispatch_resolve_conflicts_targets_pull_request() {
        let payload = json!({
            "inputs": { "action": "resolve-conflicts", "pr_number": "17" },
            "repository": repository()
        });
        let context = resolve("workflow_dispatch", payload).expect("context");
        assert_eq!(context.entity_number(), Some(17));
        assert!(context.is_pull_request());
        assert!(context.forced_intent());
        assert_eq!(context.trigger_time(), None);
    }

    #[test]
    fn functional_workflow_dispatch_ticket_parses_comment_and_attachment_lists() {
        let payload = json!({
            "inputs": {
                "action": "ticket",
                "ticket_key": "PRJ-9",
                "ticket_summary": "Login fails",
                "ticket_description": "See !screen.png!",
                "ticket_comments": "[{\"author\":\"ann\",\"body\":\"same here\",\"created\":\"2026-01-01\"}]",
                "ticket_attachments": "[{\"filename\":\"screen.png\",\"mimeType\":\"image/png\",\"size\":10,\"contentUrl\":\"https://tracker/att/1\"}]"
            },
            "repository": repository()
        });
        let context = resolve("workflow_dispatch", payload).expect("context");
        let EventPayload::WorkflowDispatch(event) = context.payload() else {
            panic!("expected workflow dispatch payload");
        };
        let DispatchAction::Ticket(ticket) = &event.action else {
            panic!("expected ticket action");
        };
        assert_eq!(ticket.key, "PRJ-9");
        assert_eq!(ticket.comments.len(), 1);
        assert_eq!(ticket.attachments[0].filename, "screen.png");
        assert_eq!(context.entity(), None);
    }

    #[test]
    fn integration_ticket_dispatch_without_summary_is_fatal() {
        let payload = json!({
            "inputs": { "action": "ticket", "ticket_key": "PRJ-9" },
            "repository": repository()
        });
        let error = resolve("workflow_dispatch", payload).expect_err("missing summary");
        assert!(matches!(
            error,
            EventContextError::MissingDispatchInput {
                input: "ticket_summary",
                ..
            }
        ));
    }

    #[test]
    fn integration_unknown_dispatch_action_is_fatal() {
        let payload = json!({ "inputs": { "action": "deploy" }, "repository": repository() });
        let error = resolve("workflow_dispatch", payload).expect_err("unknown action");
        assert!(matches!(error, EventContextError::UnknownDispatchAction(action) if action == "deploy"));
    }

    #[test]
    fn integration_check_suite_targets_first_pull_request() {
        let payload = json!({
            "action": "completed",
            "check_suite": {
                "conclusion": "failure",
                "head_branch": "feature",
                "head_sha": "abc",
                "pull_requests": [{ "number": 5 }, { "number": 6 }]
            },
            "repository": repository()
        });
        let context = resolve("check_suite", payload).expect("context");
        assert_eq!(context.entity_number(), Some(5));
        let EventPayload::CheckSuite(event) = context.payload() else {
            panic!("expected check suite payload");
        };
        assert!(event.is_failure());
    }

    #[test]
    fn regression_schedule_falls_back_to_runner_repository() {
        let identity = RunnerIdentity {
            repository_slug: Some("acme/tools".to_string()),
            ..RunnerIdentity::default()
        };
        let context = ExecutionContext::resolve(
            "schedule",
            &json!({ "schedule": "0 0 * * *" }),
            identity,
            UserInputs::default(),
        )
        .expect("context");
        assert_eq!(context.repository().slug(), "acme/tools");
        assert_eq!(context.entity(), None);

        let error = resolve("schedule", json!({ "schedule": "0 0 * * *" })).expect_err("repo");
        assert!(matches!(error, EventContextError::MissingRepository));
    }

    #[test]
    fn regression_malformed_payload_names_the_event() {
        let error = resolve("issues", json!({ "action": "opened", "repository": repository() }))
            .expect_err("malformed");
        assert!(error.to_string().contains("malformed 'issues' payload"));
    }
}
