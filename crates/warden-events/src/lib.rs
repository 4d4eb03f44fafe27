//! Event-side half of the context pipeline.
//!
//! [`ExecutionContext::resolve`] turns a raw webhook/automation payload into
//! a closed, tagged context; [`evaluate_trigger`] decides whether the agent
//! runs for it and [`detect_secondary_intents`] reports extra actions
//! requested inside comment or review bodies.

pub mod error;
pub mod execution_context;
mod payload;
pub mod ticket;
pub mod trigger;

pub use error::EventContextError;
pub use execution_context::{
    CheckRunEvent, CommentEvent, DispatchAction, EntityRef, EventKind, EventPayload,
    ExecutionContext, IssueEvent, PullRequestEvent, PushEvent, RepoRef, RepositoryDispatchEvent,
    ReviewCommentEvent, ReviewEvent, RunnerIdentity, UserInputs, WorkflowDispatchEvent,
    DEFAULT_TRIGGER_LABEL, DEFAULT_TRIGGER_PHRASE,
};
pub use ticket::{TicketAttachment, TicketComment, TicketPayload};
pub use trigger::{
    detect_secondary_intents, evaluate_trigger, should_run, RunDecision, RunReason,
    SecondaryIntent, SkipReason,
};
