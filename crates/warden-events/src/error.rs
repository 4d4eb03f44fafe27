use thiserror::Error;

#[derive(Debug, Error)]
/// Fatal configuration errors raised while resolving an event. None of them
/// is retried.
pub enum EventContextError {
    #[error("unrecognized event kind '{0}'")]
    UnrecognizedEvent(String),
    #[error("malformed '{event}' payload: {source}")]
    MalformedPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("repository is missing from the payload and the runner environment")]
    MissingRepository,
    #[error("invalid repository slug '{0}', expected owner/name")]
    InvalidRepository(String),
    #[error("invalid timestamp '{value}' in field '{field}'")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("unknown workflow_dispatch action '{0}'")]
    UnknownDispatchAction(String),
    #[error("workflow_dispatch action '{action}' requires input '{input}'")]
    MissingDispatchInput {
        action: &'static str,
        input: &'static str,
    },
    #[error("invalid workflow_dispatch input '{input}': {reason}")]
    InvalidDispatchInput { input: &'static str, reason: String },
}
