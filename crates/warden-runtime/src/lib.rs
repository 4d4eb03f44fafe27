//! Pipeline orchestration and prompt rendering.
//!
//! [`ContextPipeline::run`] takes a resolved [`warden_events::ExecutionContext`]
//! through trigger detection, fetch, time fence, attachment localization
//! and sanitization, and renders the [`TaskPayload`] handed to the agent.

pub mod context_pipeline;
pub mod prompt_formatter;
pub mod task_payload;

pub use context_pipeline::{
    sanitize_entity, ContextPipeline, EmittedTask, PipelineOutcome, PipelineSettings, SkipCause,
    DEFAULT_ATTACHMENT_CONCURRENCY,
};
pub use prompt_formatter::{
    cap_comment_body, format_entity_prompt, format_prompt_only, format_ticket_prompt,
    BODY_FENCED_NOTICE, CODE_REVIEW_INSTRUCTION, MAX_COMMENT_CHARS,
};
pub use task_payload::{MergeTask, TaskPayload};
