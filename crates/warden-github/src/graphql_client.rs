//! Batched GraphQL fetches against the GitHub API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use warden_events::{EntityRef, RepoRef};

use crate::entity::{FetchedEntity, WireEntity};
use crate::error::GithubApiError;
use crate::mergeable::{MergeableObservation, MergeableState};
use crate::queries::{issue_query, pull_request_query, MERGEABLE_QUERY, VIEWER_QUERY};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::transport_helpers::{status_error, RETRY_ATTEMPT_HEADER};

pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const USER_AGENT: &str = "warden-context-pipeline";

#[derive(Debug, Clone)]
/// Public struct `GithubClientConfig` used across Warden components.
pub struct GithubClientConfig {
    pub graphql_url: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl GithubClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            token: token.into(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            retry: RetryPolicy::default(),
        }
    }
}

#[async_trait]
/// Read side of the GitHub API the pipeline depends on.
pub trait EntityFetcher: Send + Sync {
    async fn fetch_issue(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<FetchedEntity, GithubApiError>;

    async fn fetch_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<FetchedEntity, GithubApiError>;

    async fn resolve_viewer_login(&self) -> Result<String, GithubApiError>;

    async fn fetch_mergeable_state(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<MergeableObservation, GithubApiError>;

    async fn fetch(
        &self,
        repo: &RepoRef,
        entity: EntityRef,
    ) -> Result<FetchedEntity, GithubApiError> {
        if entity.is_pull_request {
            self.fetch_pull_request(repo, entity.number).await
        } else {
            self.fetch_issue(repo, entity.number).await
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Clone)]
pub struct GithubGraphqlClient {
    http: reqwest::Client,
    graphql_url: String,
    retry: RetryPolicy,
}

impl GithubGraphqlClient {
    pub fn new(config: GithubClientConfig) -> Result<Self, GithubApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let auth_header = format!("Bearer {}", config.token.trim());
        let mut auth_value = reqwest::header::HeaderValue::from_str(&auth_header)
            .map_err(|_| GithubApiError::Client("invalid github authorization header".into()))?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| GithubApiError::Client(error.to_string()))?;
        Ok(Self {
            http,
            graphql_url: config.graphql_url,
            retry: config.retry,
        })
    }

    /// Runs one GraphQL document under the retry policy and returns `data`.
    async fn query(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, GithubApiError> {
        let payload = json!({ "query": query, "variables": variables });
        run_with_retry(&self.retry, operation, |attempt| {
            let request = self
                .http
                .post(&self.graphql_url)
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .json(&payload);
            async move {
                let response =
                    request
                        .send()
                        .await
                        .map_err(|source| GithubApiError::Transport {
                            operation: operation.to_string(),
                            source,
                        })?;
                if !response.status().is_success() {
                    return Err(status_error(operation, response).await);
                }
                let raw = response
                    .bytes()
                    .await
                    .map_err(|source| GithubApiError::Transport {
                        operation: operation.to_string(),
                        source,
                    })?;
                let parsed: GraphqlResponse =
                    serde_json::from_slice(&raw).map_err(|source| GithubApiError::Decode {
                        operation: operation.to_string(),
                        source,
                    })?;
                if !parsed.errors.is_empty() {
                    let not_found = parsed
                        .errors
                        .iter()
                        .any(|entry| entry.kind.as_deref() == Some("NOT_FOUND"));
                    return Err(GithubApiError::GraphQl {
                        operation: operation.to_string(),
                        messages: parsed.errors.into_iter().map(|entry| entry.message).collect(),
                        not_found,
                    });
                }
                Ok(parsed.data.unwrap_or(Value::Null))
            }
        })
        .await
    }

    async fn fetch_entity(
        &self,
        repo: &RepoRef,
        number: u64,
        is_pull_request: bool,
    ) -> Result<FetchedEntity, GithubApiError> {
        let (operation, field, kind, query) = if is_pull_request {
            (
                "fetch pull request",
                "pullRequest",
                "pull request",
                pull_request_query(),
            )
        } else {
            ("fetch issue", "issue", "issue", issue_query())
        };
        let data = self
            .query(
                operation,
                &query,
                json!({ "owner": repo.owner, "repo": repo.name, "number": number }),
            )
            .await?;
        let node = data
            .get("repository")
            .and_then(|repository| repository.get(field))
            .filter(|node| !node.is_null())
            .cloned()
            .ok_or_else(|| GithubApiError::MissingEntity {
                kind,
                repository: repo.slug(),
                number,
            })?;
        let wire: WireEntity = decode(operation, node)?;
        let entity = wire.into_entity(is_pull_request);
        info!(
            repository = %repo.slug(),
            number,
            kind,
            timeline_items = entity.timeline.len(),
            reviews = entity.reviews.len(),
            "fetched github entity"
        );
        Ok(entity)
    }
}

fn decode<T: DeserializeOwned>(operation: &str, value: Value) -> Result<T, GithubApiError> {
    serde_json::from_value(value).map_err(|source| GithubApiError::Decode {
        operation: operation.to_string(),
        source,
    })
}

#[async_trait]
impl EntityFetcher for GithubGraphqlClient {
    async fn fetch_issue(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<FetchedEntity, GithubApiError> {
        self.fetch_entity(repo, number, false).await
    }

    async fn fetch_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<FetchedEntity, GithubApiError> {
        self.fetch_entity(repo, number, true).await
    }

    async fn resolve_viewer_login(&self) -> Result<String, GithubApiError> {
        #[derive(Deserialize)]
        struct Viewer {
            login: String,
        }
        #[derive(Deserialize)]
        struct ViewerData {
            viewer: Viewer,
        }

        let data = self
            .query("resolve viewer login", VIEWER_QUERY, json!({}))
            .await?;
        let viewer: ViewerData = decode("resolve viewer login", data)?;
        debug!(login = %viewer.viewer.login, "resolved token login");
        Ok(viewer.viewer.login)
    }

    async fn fetch_mergeable_state(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<MergeableObservation, GithubApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct MergeableNode {
            mergeable: Option<String>,
            head_ref_name: String,
        }

        let operation = "fetch mergeable state";
        let data = self
            .query(
                operation,
                MERGEABLE_QUERY,
                json!({ "owner": repo.owner, "repo": repo.name, "number": number }),
            )
            .await?;
        let node = data
            .get("repository")
            .and_then(|repository| repository.get("pullRequest"))
            .filter(|node| !node.is_null())
            .cloned()
            .ok_or_else(|| GithubApiError::MissingEntity {
                kind: "pull request",
                repository: repo.slug(),
                number,
            })?;
        let node: MergeableNode = decode(operation, node)?;
        Ok(MergeableObservation {
            state: MergeableState::parse(node.mergeable.as_deref()),
            head_branch: node.head_ref_name,
        })
    }
}
