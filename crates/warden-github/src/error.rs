use thiserror::Error;

/// Statuses that mean "retrying cannot help": bad credentials, missing
/// permission, missing entity, invalid request.
pub const PERMANENT_GITHUB_STATUSES: &[u16] = &[401, 403, 404, 422];

pub fn is_permanent_github_status(status: u16) -> bool {
    PERMANENT_GITHUB_STATUSES.contains(&status)
}

#[derive(Debug, Error)]
/// Enumerates failures of the GitHub query API.
pub enum GithubApiError {
    #[error("failed to build github client: {0}")]
    Client(String),
    #[error("github api {operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
        retry_after_ms: Option<u64>,
    },
    #[error("github api {operation} request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("github graphql {operation} returned errors: {}", .messages.join("; "))]
    GraphQl {
        operation: String,
        messages: Vec<String>,
        not_found: bool,
    },
    #[error("failed to decode github {operation} response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} #{number} was not found in {repository}")]
    MissingEntity {
        kind: &'static str,
        repository: String,
        number: u64,
    },
}

impl GithubApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::GraphQl {
                not_found: true, ..
            }
            | Self::MissingEntity { .. } => Some(404),
            _ => None,
        }
    }

    /// Permanent failures are surfaced immediately and never retried.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Client(_) => true,
            other => other.status().is_some_and(is_permanent_github_status),
        }
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Status { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}
