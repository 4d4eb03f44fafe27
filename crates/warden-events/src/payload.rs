//! Raw webhook payload shapes. Platform field names are only spelled out in
//! this module; the resolver converts them into the typed context.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct RawUser {
    pub(crate) login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLabel {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRepository {
    pub(crate) name: String,
    pub(crate) owner: RawUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEnvelope {
    #[serde(default)]
    pub(crate) repository: Option<RawRepository>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssue {
    pub(crate) number: u64,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) body: Option<String>,
    pub(crate) user: RawUser,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    #[serde(default)]
    pub(crate) pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssuesEvent {
    pub(crate) action: String,
    pub(crate) issue: RawIssue,
    #[serde(default)]
    pub(crate) assignee: Option<RawUser>,
    #[serde(default)]
    pub(crate) label: Option<RawLabel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComment {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) body: Option<String>,
    pub(crate) user: RawUser,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    #[serde(default)]
    pub(crate) path: Option<String>,
    #[serde(default)]
    pub(crate) in_reply_to_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssueCommentEvent {
    pub(crate) action: String,
    pub(crate) issue: RawIssue,
    pub(crate) comment: RawComment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBranchRef {
    #[serde(rename = "ref")]
    pub(crate) ref_name: String,
    #[serde(default)]
    pub(crate) sha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPullRequest {
    pub(crate) number: u64,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) body: Option<String>,
    pub(crate) user: RawUser,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) head: RawBranchRef,
    pub(crate) base: RawBranchRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPullRequestEvent {
    pub(crate) action: String,
    pub(crate) pull_request: RawPullRequest,
    #[serde(default)]
    pub(crate) assignee: Option<RawUser>,
    #[serde(default)]
    pub(crate) label: Option<RawLabel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReview {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) body: Option<String>,
    pub(crate) user: RawUser,
    #[serde(default)]
    pub(crate) submitted_at: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReviewEvent {
    pub(crate) action: String,
    pub(crate) review: RawReview,
    pub(crate) pull_request: RawPullRequest,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReviewCommentEvent {
    pub(crate) action: String,
    pub(crate) comment: RawComment,
    pub(crate) pull_request: RawPullRequest,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPushEvent {
    #[serde(rename = "ref")]
    pub(crate) ref_name: String,
    #[serde(default)]
    pub(crate) after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawWorkflowDispatchEvent {
    #[serde(default)]
    pub(crate) inputs: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPullRequestNumber {
    pub(crate) number: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCheckRun {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) conclusion: Option<String>,
    #[serde(default)]
    pub(crate) head_branch: Option<String>,
    #[serde(default)]
    pub(crate) head_sha: Option<String>,
    #[serde(default)]
    pub(crate) pull_requests: Vec<RawPullRequestNumber>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCheckSuiteEvent {
    pub(crate) action: String,
    pub(crate) check_suite: RawCheckRun,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawWorkflowRunEvent {
    pub(crate) action: String,
    pub(crate) workflow_run: RawCheckRun,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRepositoryDispatchEvent {
    pub(crate) action: String,
    #[serde(default)]
    pub(crate) client_payload: Value,
}
