//! GitHub side of the context pipeline: batched GraphQL fetches with
//! bounded retry, the trigger-time fence, attachment localization and the
//! mergeable-state poller used by conflict resolution.

#![recursion_limit = "256"]

pub mod attachments;
pub mod entity;
pub mod error;
pub mod graphql_client;
pub mod mergeable;
pub mod queries;
pub mod retry;
pub mod ticket_attachments;
pub mod time_fence;
mod transport_helpers;

pub use attachments::{
    attachment_filename, collect_attachment_references, AttachmentError, AttachmentFetch, AttachmentKind,
    AttachmentReference, AttachmentResolver, AttachmentStore, FetchedAttachment,
    HttpAttachmentFetcher, DEFAULT_ATTACHMENT_MAX_BYTES, DEFAULT_ATTACHMENT_TIMEOUT_MS,
};
pub use entity::{
    ChangedFile, CommitSummary, FetchedEntity, PullRequestDetails, ReferenceSource, Review,
    ReviewComment, TimelineComment, TimelineItem,
};
pub use error::{is_permanent_github_status, GithubApiError, PERMANENT_GITHUB_STATUSES};
pub use graphql_client::{
    EntityFetcher, GithubClientConfig, GithubGraphqlClient, DEFAULT_GRAPHQL_URL,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
pub use mergeable::{
    poll_mergeable_state, MergeOutcome, MergePhase, MergePollConfig, MergeableObservation,
    MergeablePoller, MergeableState,
};
pub use retry::{run_with_retry, RetryPolicy};
pub use ticket_attachments::{
    referenced_ticket_files, TicketAttachmentResolver, TicketTrackerClient,
};
pub use time_fence::{FenceReport, TimeFence};
