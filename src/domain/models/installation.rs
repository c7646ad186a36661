//! Installation model: one linked source-account to tracker-site pairing.

use serde::{Deserialize, Serialize};

use super::sync_status::RepositoryRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub installation_id: i64,
    /// Tracker base URL, e.g. `https://acme.atlassian.net`.
    pub jira_host: String,
    pub repositories: Vec<RepositoryRef>,
}

impl Installation {
    pub fn new(installation_id: i64, jira_host: impl Into<String>) -> Self {
        Self {
            installation_id,
            jira_host: jira_host.into(),
            repositories: Vec::new(),
        }
    }

    pub fn with_repository(mut self, repository: RepositoryRef) -> Self {
        self.repositories.push(repository);
        self
    }
}

/// Summary row used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationSummary {
    pub installation_id: i64,
    pub jira_host: String,
    pub repository_count: i64,
    pub created_at: String,
}
