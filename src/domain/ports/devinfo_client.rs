use async_trait::async_trait;

use crate::domain::errors::SyncResult;
use crate::domain::models::DevInfoPayload;

/// Port for the tracker's development-information bulk endpoint.
#[async_trait]
pub trait DevInfoClient: Send + Sync {
    /// Submit one chunk. `jira_host` is the tracker base URL of the
    /// installation.
    async fn upload(&self, jira_host: &str, payload: &DevInfoPayload) -> SyncResult<()>;
}
