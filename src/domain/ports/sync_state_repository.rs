use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Installation, InstallationSummary, RepoSyncStatus};

/// Repository port for installations and their per-repository sync state.
#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    /// Sync records of every repository of the installation, or `None` when
    /// the installation does not exist (anymore).
    async fn load(&self, installation_id: i64, jira_host: &str) -> DomainResult<Option<Vec<RepoSyncStatus>>>;

    /// Upsert one repository record. Last writer wins.
    async fn save(&self, status: &RepoSyncStatus) -> DomainResult<()>;

    /// Register an installation and its repositories. Repositories already
    /// tracked keep their state.
    async fn add_installation(&self, installation: &Installation) -> DomainResult<()>;

    /// Remove an installation and every repository record under it.
    /// Returns whether anything was removed.
    async fn remove_installation(&self, installation_id: i64, jira_host: &str) -> DomainResult<bool>;

    async fn list_installations(&self) -> DomainResult<Vec<InstallationSummary>>;

    /// Put commit sync back to the start of history, for one repository or
    /// all of them. Returns the number of records reset.
    async fn reset(
        &self,
        installation_id: i64,
        jira_host: &str,
        repository_id: Option<&str>,
    ) -> DomainResult<u64>;
}
