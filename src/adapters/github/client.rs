//! GitHub HTTP client.
//!
//! History pages come from the GraphQL API, single commits with their files
//! from REST. Outgoing requests are throttled per installation so one busy
//! installation cannot starve the others of quota.

use async_trait::async_trait;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::GithubApiError;
use super::types::{
    DefaultBranchData, GraphQlRequest, GraphQlResponse, HistoryData, RestCommit, DEFAULT_BRANCH_QUERY,
    HISTORY_QUERY,
};
use crate::domain::errors::SyncResult;
use crate::domain::models::{Page, RepositoryRef, SourceCommit, SourceConfig};
use crate::domain::ports::CommitSource;

const CLIENT_USER_AGENT: &str = concat!("devsync/", env!("CARGO_PKG_VERSION"));

/// [`CommitSource`] backed by the GitHub API.
#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
    limiter: Arc<DefaultKeyedRateLimiter<i64>>,
}

impl GithubClient {
    pub fn new(
        api_url: impl Into<String>,
        token: Option<String>,
        requests_per_second: u32,
        timeout: Duration,
    ) -> Result<Self, GithubApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            limiter: Arc::new(RateLimiter::keyed(Quota::per_second(per_second))),
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, GithubApiError> {
        Self::new(
            config.api_url.clone(),
            config.token.clone(),
            config.requests_per_second,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Wait for the installation's quota, then build the request.
    async fn request(&self, installation_id: i64, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.limiter.until_key_ready(&installation_id).await;
        let builder = self.http.request(method, format!("{}{path}", self.api_url));
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GithubApiError> {
        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(GithubApiError::from_status(status, &headers, &body));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GithubApiError::Malformed(e.to_string()))
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        installation_id: i64,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GithubApiError> {
        let response = self
            .request(installation_id, reqwest::Method::POST, "/graphql")
            .await
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let body: GraphQlResponse<T> = Self::decode(response).await?;
        if let Some(limited) = body.errors.iter().find(|e| e.is_rate_limit()) {
            debug!(message = %limited.message, "GraphQL rate limit");
            return Err(GithubApiError::RateLimited { retry_after: None });
        }
        if let Some(first) = body.errors.first() {
            return Err(GithubApiError::GraphQl(first.message.clone()));
        }
        body.data
            .ok_or_else(|| GithubApiError::Malformed("GraphQL response without data".to_string()))
    }
}

#[async_trait]
impl CommitSource for GithubClient {
    async fn default_branch(&self, installation_id: i64, repository: &RepositoryRef) -> SyncResult<Option<String>> {
        let data: DefaultBranchData = self
            .graphql(
                installation_id,
                DEFAULT_BRANCH_QUERY,
                serde_json::json!({ "owner": repository.owner, "repo": repository.name }),
            )
            .await?;

        let repo = data
            .repository
            .ok_or_else(|| GithubApiError::NotFound(repository.full_name()))?;
        Ok(repo.default_branch_ref.map(|r| r.name))
    }

    async fn history_page(
        &self,
        installation_id: i64,
        repository: &RepositoryRef,
        branch: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> SyncResult<Page<SourceCommit>> {
        let data: HistoryData = self
            .graphql(
                installation_id,
                HISTORY_QUERY,
                serde_json::json!({
                    "owner": repository.owner,
                    "repo": repository.name,
                    "branch": branch,
                    "per_page": page_size,
                    "cursor": cursor,
                }),
            )
            .await?;

        let repo = data
            .repository
            .ok_or_else(|| GithubApiError::NotFound(repository.full_name()))?;
        let Some(history) = repo
            .git_ref
            .and_then(|r| r.target)
            .and_then(|t| t.history)
        else {
            warn!(repository = %repository.full_name(), branch, "branch has no history; treating as empty");
            return Ok(Page::last(Vec::new()));
        };

        let records = history.nodes.into_iter().map(SourceCommit::from).collect();
        Ok(Page::new(
            records,
            history.page_info.end_cursor,
            history.page_info.has_next_page,
        ))
    }

    async fn get_commit(&self, installation_id: i64, repository: &RepositoryRef, sha: &str) -> SyncResult<SourceCommit> {
        let path = format!("/repos/{}/{}/commits/{sha}", repository.owner, repository.name);
        let response = self
            .request(installation_id, reqwest::Method::GET, &path)
            .await
            .send()
            .await
            .map_err(GithubApiError::from)?;
        let commit: RestCommit = Self::decode(response).await?;
        Ok(SourceCommit::from(commit))
    }
}
