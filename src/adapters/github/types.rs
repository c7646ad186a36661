//! GitHub GraphQL and REST payloads used by the commit source.

use serde::{Deserialize, Serialize};

use crate::domain::models::{SourceCommit, SourceFile};

pub const DEFAULT_BRANCH_QUERY: &str = r"query ($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    defaultBranchRef { name }
  }
}";

pub const HISTORY_QUERY: &str = r"query ($owner: String!, $repo: String!, $branch: String!, $per_page: Int!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    ref(qualifiedName: $branch) {
      target {
        ... on Commit {
          history(first: $per_page, after: $cursor) {
            pageInfo { hasNextPage endCursor }
            nodes {
              oid
              message
              url
              authoredDate
              changedFilesIfAvailable
              author { name email user { login } }
              parents { totalCount }
            }
          }
        }
      }
    }
  }
}";

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    pub message: String,
}

impl GraphQlError {
    pub fn is_rate_limit(&self) -> bool {
        self.error_type.as_deref() == Some("RATE_LIMITED")
    }
}

#[derive(Debug, Deserialize)]
pub struct DefaultBranchData {
    pub repository: Option<DefaultBranchRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultBranchRepository {
    pub default_branch_ref: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryData {
    pub repository: Option<HistoryRepository>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRepository {
    #[serde(rename = "ref")]
    pub git_ref: Option<HistoryRef>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRef {
    pub target: Option<HistoryTarget>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryTarget {
    pub history: Option<History>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<CommitNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    pub oid: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub authored_date: String,
    pub changed_files_if_available: Option<u32>,
    pub author: Option<GitActor>,
    pub parents: Option<TotalCount>,
}

#[derive(Debug, Deserialize)]
pub struct GitActor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub user: Option<Login>,
}

#[derive(Debug, Deserialize)]
pub struct Login {
    pub login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u32,
}

impl From<CommitNode> for SourceCommit {
    fn from(node: CommitNode) -> Self {
        let (author_name, author_email, author_login) = match node.author {
            Some(actor) => (
                actor.name.unwrap_or_default(),
                actor.email.unwrap_or_default(),
                actor.user.map(|u| u.login),
            ),
            None => (String::new(), String::new(), None),
        };
        Self {
            oid: node.oid,
            message: node.message,
            url: node.url,
            authored_date: node.authored_date,
            author_name,
            author_email,
            author_login,
            parent_count: node.parents.map_or(0, |p| p.total_count),
            files: Vec::new(),
            file_count: node.changed_files_if_available.unwrap_or(0),
        }
    }
}

/// `GET /repos/{owner}/{repo}/commits/{sha}`
#[derive(Debug, Deserialize)]
pub struct RestCommit {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    pub commit: RestCommitDetail,
    pub author: Option<Login>,
    #[serde(default)]
    pub parents: Vec<serde_json::Value>,
    #[serde(default)]
    pub files: Vec<RestFile>,
}

#[derive(Debug, Deserialize)]
pub struct RestCommitDetail {
    #[serde(default)]
    pub message: String,
    pub author: Option<RestGitAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct RestGitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct RestFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub blob_url: String,
}

impl From<RestCommit> for SourceCommit {
    fn from(commit: RestCommit) -> Self {
        let git_author = commit.commit.author.unwrap_or(RestGitAuthor {
            name: String::new(),
            email: String::new(),
            date: String::new(),
        });
        let file_count = u32::try_from(commit.files.len()).unwrap_or(u32::MAX);
        Self {
            oid: commit.sha,
            message: commit.commit.message,
            url: commit.html_url,
            authored_date: git_author.date,
            author_name: git_author.name,
            author_email: git_author.email,
            author_login: commit.author.map(|a| a.login),
            parent_count: u32::try_from(commit.parents.len()).unwrap_or(u32::MAX),
            files: commit
                .files
                .into_iter()
                .map(|f| SourceFile {
                    filename: f.filename,
                    status: f.status,
                    additions: f.additions,
                    deletions: f.deletions,
                    blob_url: f.blob_url,
                })
                .collect(),
            file_count,
        }
    }
}
