//! Fetched issue / pull-request projection.
//!
//! Every nested item keeps its own `created_at` / `last_edited_at`, which is
//! what the time fence filters on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

const GHOST_LOGIN: &str = "ghost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineComment {
    pub id: String,
    pub database_id: Option<u64>,
    pub author: String,
    pub body: String,
    pub body_html: String,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSource {
    pub is_pull_request: bool,
    pub number: Option<u64>,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineItem {
    Comment(TimelineComment),
    CrossReference {
        actor: String,
        created_at: DateTime<Utc>,
        source: ReferenceSource,
    },
    CommitReference {
        actor: String,
        created_at: DateTime<Utc>,
        oid: String,
        message_headline: String,
    },
}

impl TimelineItem {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Comment(comment) => comment.created_at,
            Self::CrossReference { created_at, .. } | Self::CommitReference { created_at, .. } => {
                *created_at
            }
        }
    }

    pub fn last_edited_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Comment(comment) => comment.last_edited_at,
            Self::CrossReference { .. } | Self::CommitReference { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub id: String,
    pub database_id: Option<u64>,
    pub author: String,
    pub body: String,
    pub body_html: String,
    pub path: String,
    pub diff_hunk: String,
    pub position: Option<u64>,
    pub line: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: Option<DateTime<Utc>>,
    /// Database id of the comment this one replies to.
    pub reply_to: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: String,
    pub database_id: Option<u64>,
    pub author: String,
    pub body: String,
    pub body_html: String,
    pub state: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub comments: Vec<ReviewComment>,
}

impl Review {
    /// Original submission time, falling back to creation for pending reviews.
    pub fn submission_time(&self) -> DateTime<Utc> {
        self.submitted_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
    pub change_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub oid: String,
    pub headline: String,
    pub author_name: Option<String>,
    pub committed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDetails {
    pub head_branch: String,
    pub base_branch: String,
    pub head_sha: String,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Issue or pull request as returned by one batched query.
pub struct FetchedEntity {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub body_html: String,
    pub state: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: Option<DateTime<Utc>>,
    /// Cleared by the time fence when the body changed after the trigger.
    pub body_safe: bool,
    pub pull_request: Option<PullRequestDetails>,
    pub timeline: Vec<TimelineItem>,
    pub reviews: Vec<Review>,
    pub files: Vec<ChangedFile>,
    pub commits: Vec<CommitSummary>,
}

impl FetchedEntity {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn kind_label(&self) -> &'static str {
        if self.is_pull_request() {
            "pull request"
        } else {
            "issue"
        }
    }
}

// ---------------------------------------------------------------------------
// GraphQL wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct WireActor {
    login: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn login_or_ghost(actor: Option<WireActor>) -> String {
    actor
        .map(|actor| actor.login)
        .unwrap_or_else(|| GHOST_LOGIN.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct WireNodes<T> {
    #[serde(default)]
    nodes: Vec<Option<T>>,
}

impl<T> Default for WireNodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> WireNodes<T> {
    fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireIssueComment {
    id: String,
    database_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    body: String,
    #[serde(rename = "bodyHTML", default, deserialize_with = "null_as_default")]
    body_html: String,
    created_at: DateTime<Utc>,
    last_edited_at: Option<DateTime<Utc>>,
    author: Option<WireActor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReferenceSource {
    #[serde(rename = "__typename")]
    typename: String,
    number: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCrossReference {
    created_at: DateTime<Utc>,
    actor: Option<WireActor>,
    source: Option<WireReferenceSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReferencedCommit {
    oid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    message_headline: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCommitReference {
    created_at: DateTime<Utc>,
    actor: Option<WireActor>,
    commit: Option<WireReferencedCommit>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub(crate) enum WireTimelineNode {
    IssueComment(WireIssueComment),
    CrossReferencedEvent(WireCrossReference),
    ReferencedEvent(WireCommitReference),
    #[serde(other)]
    Other,
}

impl WireTimelineNode {
    fn into_item(self) -> Option<TimelineItem> {
        match self {
            Self::IssueComment(comment) => Some(TimelineItem::Comment(TimelineComment {
                id: comment.id,
                database_id: comment.database_id,
                author: login_or_ghost(comment.author),
                body: comment.body,
                body_html: comment.body_html,
                created_at: comment.created_at,
                last_edited_at: comment.last_edited_at,
            })),
            Self::CrossReferencedEvent(reference) => {
                let source = reference.source?;
                Some(TimelineItem::CrossReference {
                    actor: login_or_ghost(reference.actor),
                    created_at: reference.created_at,
                    source: ReferenceSource {
                        is_pull_request: source.typename == "PullRequest",
                        number: source.number,
                        title: source.title,
                        url: source.url,
                    },
                })
            }
            Self::ReferencedEvent(reference) => {
                let commit = reference.commit?;
                Some(TimelineItem::CommitReference {
                    actor: login_or_ghost(reference.actor),
                    created_at: reference.created_at,
                    oid: commit.oid,
                    message_headline: commit.message_headline,
                })
            }
            Self::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReplyTo {
    #[serde(rename = "databaseId")]
    database_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReviewComment {
    id: String,
    database_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    body: String,
    #[serde(rename = "bodyHTML", default, deserialize_with = "null_as_default")]
    body_html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    diff_hunk: String,
    position: Option<u64>,
    line: Option<u64>,
    created_at: DateTime<Utc>,
    last_edited_at: Option<DateTime<Utc>>,
    author: Option<WireActor>,
    reply_to: Option<WireReplyTo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReview {
    id: String,
    database_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    body: String,
    #[serde(rename = "bodyHTML", default, deserialize_with = "null_as_default")]
    body_html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    state: String,
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_edited_at: Option<DateTime<Utc>>,
    author: Option<WireActor>,
    #[serde(default, deserialize_with = "null_as_default")]
    comments: WireNodes<WireReviewComment>,
}

impl From<WireReview> for Review {
    fn from(review: WireReview) -> Self {
        let mut comments = review
            .comments
            .into_items()
            .map(|comment| ReviewComment {
                id: comment.id,
                database_id: comment.database_id,
                author: login_or_ghost(comment.author),
                body: comment.body,
                body_html: comment.body_html,
                path: comment.path,
                diff_hunk: comment.diff_hunk,
                position: comment.position,
                line: comment.line,
                created_at: comment.created_at,
                last_edited_at: comment.last_edited_at,
                reply_to: comment.reply_to.and_then(|reply| reply.database_id),
            })
            .collect::<Vec<_>>();
        comments.sort_by_key(|comment| comment.created_at);
        Review {
            id: review.id,
            database_id: review.database_id,
            author: login_or_ghost(review.author),
            body: review.body,
            body_html: review.body_html,
            state: review.state,
            submitted_at: review.submitted_at,
            created_at: review.created_at,
            last_edited_at: review.last_edited_at,
            comments,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCommitAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCommit {
    oid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    message_headline: String,
    committed_date: Option<DateTime<Utc>>,
    author: Option<WireCommitAuthor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCommitNode {
    commit: WireCommit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireChangedFile {
    path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    additions: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    deletions: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    change_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Shared wire shape for `issue` and `pullRequest`; PR-only fields are
/// absent for issues.
pub(crate) struct WireEntity {
    number: u64,
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    body: String,
    #[serde(rename = "bodyHTML", default, deserialize_with = "null_as_default")]
    body_html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_edited_at: Option<DateTime<Utc>>,
    author: Option<WireActor>,
    #[serde(default, deserialize_with = "null_as_default")]
    timeline_items: WireNodes<WireTimelineNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    reviews: WireNodes<WireReview>,
    #[serde(default, deserialize_with = "null_as_default")]
    commits: WireNodes<WireCommitNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    files: WireNodes<WireChangedFile>,
    head_ref_name: Option<String>,
    base_ref_name: Option<String>,
    head_ref_oid: Option<String>,
    additions: Option<u64>,
    deletions: Option<u64>,
}

impl WireEntity {
    pub(crate) fn into_entity(self, is_pull_request: bool) -> FetchedEntity {
        let pull_request = is_pull_request.then(|| PullRequestDetails {
            head_branch: self.head_ref_name.clone().unwrap_or_default(),
            base_branch: self.base_ref_name.clone().unwrap_or_default(),
            head_sha: self.head_ref_oid.clone().unwrap_or_default(),
            additions: self.additions.unwrap_or_default(),
            deletions: self.deletions.unwrap_or_default(),
        });
        let mut timeline = self
            .timeline_items
            .into_items()
            .filter_map(WireTimelineNode::into_item)
            .collect::<Vec<_>>();
        timeline.sort_by_key(TimelineItem::created_at);
        let mut reviews = self
            .reviews
            .into_items()
            .map(Review::from)
            .collect::<Vec<_>>();
        reviews.sort_by_key(Review::submission_time);
        FetchedEntity {
            number: self.number,
            title: self.title,
            body: self.body,
            body_html: self.body_html,
            state: self.state,
            author: login_or_ghost(self.author),
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_edited_at: self.last_edited_at,
            body_safe: true,
            pull_request,
            timeline,
            reviews,
            files: self
                .files
                .into_items()
                .map(|file| ChangedFile {
                    path: file.path,
                    additions: file.additions,
                    deletions: file.deletions,
                    change_type: file.change_type,
                })
                .collect(),
            commits: self
                .commits
                .into_items()
                .map(|node| CommitSummary {
                    oid: node.commit.oid,
                    headline: node.commit.message_headline,
                    author_name: node.commit.author.and_then(|author| author.name),
                    committed_at: node.commit.committed_date,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{TimelineItem, WireEntity};

    #[test]
    fn unit_wire_entity_converts_pull_request_graph() {
        let raw = json!({
            "number": 9,
            "title": "Add cache",
            "body": "body",
            "bodyHTML": "<p>body</p>",
            "state": "OPEN",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T01:00:00Z",
            "lastEditedAt": null,
            "author": null,
            "headRefName": "feature/cache",
            "baseRefName": "main",
            "headRefOid": "abc",
            "additions": 10,
            "deletions": 2,
            "commits": { "nodes": [{ "commit": { "oid": "abc", "messageHeadline": "add cache", "committedDate": "2026-01-01T00:10:00Z", "author": { "name": "Ann" } } }] },
            "files": { "nodes": [{ "path": "src/cache.rs", "additions": 10, "deletions": 2, "changeType": "ADDED" }] },
            "timelineItems": { "nodes": [
                { "__typename": "IssueComment", "id": "c2", "databaseId": 2, "body": "second", "bodyHTML": "", "createdAt": "2026-01-01T00:30:00Z", "lastEditedAt": null, "author": { "login": "bob" } },
                { "__typename": "IssueComment", "id": "c1", "databaseId": 1, "body": "first", "bodyHTML": "", "createdAt": "2026-01-01T00:20:00Z", "lastEditedAt": null, "author": { "login": "amy" } },
                { "__typename": "LabeledEvent" },
                { "__typename": "ReferencedEvent", "createdAt": "2026-01-01T00:25:00Z", "actor": null, "commit": null }
            ] },
            "reviews": { "nodes": [{
                "id": "r1", "databaseId": 11, "body": "", "bodyHTML": "", "state": "COMMENTED",
                "submittedAt": "2026-01-01T00:40:00Z", "createdAt": "2026-01-01T00:35:00Z", "lastEditedAt": null,
                "author": { "login": "carol" },
                "comments": { "nodes": [
                    { "id": "rc2", "databaseId": 22, "body": "reply", "bodyHTML": "", "path": "src/cache.rs", "diffHunk": "@@", "position": 3, "line": 7, "createdAt": "2026-01-01T00:39:00Z", "lastEditedAt": null, "author": { "login": "bob" }, "replyTo": { "databaseId": 21 } },
                    { "id": "rc1", "databaseId": 21, "body": "root", "bodyHTML": "", "path": "src/cache.rs", "diffHunk": "@@", "position": 3, "line": 7, "createdAt": "2026-01-01T00:36:00Z", "lastEditedAt": null, "author": { "login": "carol" }, "replyTo": null }
                ] }
            }] }
        });
        let wire: WireEntity = serde_json::from_value(raw).expect("wire entity");
        let entity = wire.into_entity(true);
        assert_eq!(entity.author, "ghost");
        assert!(entity.is_pull_request());
        assert_eq!(entity.timeline.len(), 2);
        let TimelineItem::Comment(first) = &entity.timeline[0] else {
            panic!("expected comment");
        };
        assert_eq!(first.body, "first");
        assert_eq!(entity.reviews[0].comments[0].id, "rc1");
        assert_eq!(entity.reviews[0].comments[1].reply_to, Some(21));
        assert_eq!(entity.commits[0].author_name.as_deref(), Some("Ann"));
        assert_eq!(entity.files[0].change_type, "ADDED");
    }

    #[test]
    fn regression_issue_wire_entity_without_pull_request_fields() {
        let raw = json!({
            "number": 1,
            "title": "Issue",
            "body": null,
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z",
            "author": { "login": "amy" }
        });
        let wire: WireEntity = serde_json::from_value(raw).expect("wire entity");
        let entity = wire.into_entity(false);
        assert!(entity.pull_request.is_none());
        assert!(entity.reviews.is_empty());
        assert_eq!(entity.body, "");
    }

    #[test]
    fn regression_null_connections_and_null_nodes_decode_as_empty() {
        let raw = json!({
            "number": 4,
            "title": "Nulls",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z",
            "author": { "login": "amy" },
            "timelineItems": null,
            "reviews": { "nodes": [null, {
                "id": "r1", "databaseId": 1, "body": "ok", "state": "APPROVED",
                "submittedAt": null, "createdAt": "2026-01-01T00:00:00Z", "lastEditedAt": null,
                "author": null, "comments": null
            }] },
            "commits": null,
            "files": { "nodes": [null] }
        });
        let wire: WireEntity = serde_json::from_value(raw).expect("wire entity");
        let entity = wire.into_entity(true);
        assert!(entity.timeline.is_empty());
        assert_eq!(entity.reviews.len(), 1);
        assert!(entity.reviews[0].comments.is_empty());
        assert!(entity.commits.is_empty());
        assert!(entity.files.is_empty());
    }
}
