use async_trait::async_trait;

use crate::domain::errors::SyncResult;
use crate::domain::models::{Page, RepositoryRef, SourceCommit};

/// Port for reading commit history from the source host.
///
/// Authentication is the adapter's concern; callers only pass the
/// installation the request is made on behalf of.
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Name of the repository's default branch, or `None` when the remote
    /// reports none.
    async fn default_branch(
        &self,
        installation_id: i64,
        repository: &RepositoryRef,
    ) -> SyncResult<Option<String>>;

    /// One page of `branch` history starting after `cursor`
    /// (`None` = newest commit).
    async fn history_page(
        &self,
        installation_id: i64,
        repository: &RepositoryRef,
        branch: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> SyncResult<Page<SourceCommit>>;

    /// Full detail of a single commit, including its files.
    async fn get_commit(
        &self,
        installation_id: i64,
        repository: &RepositoryRef,
        sha: &str,
    ) -> SyncResult<SourceCommit>;
}
