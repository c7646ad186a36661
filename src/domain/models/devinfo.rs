//! Tracker bulk-upload payload.

use serde::{Deserialize, Serialize};

use super::commit::CommitRecord;
use super::sync_status::RepositoryRef;

/// Tracker hard limit of commits per bulk request.
pub const MAX_COMMITS_PER_REQUEST: usize = 400;

/// Tracker hard limit of file entries per commit.
pub const MAX_FILES_PER_COMMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryPayload {
    pub id: String,
    pub name: String,
    pub url: String,
    pub commits: Vec<CommitRecord>,
    pub update_sequence_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadProperties {
    pub installation_id: i64,
}

/// Body of `POST /rest/devinfo/0.10/bulk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevInfoPayload {
    pub prevent_transitions: bool,
    pub repositories: Vec<RepositoryPayload>,
    pub properties: PayloadProperties,
}

impl DevInfoPayload {
    /// Payload for one chunk of one repository. Transitions are always
    /// suppressed for synced history.
    pub fn for_chunk(
        installation_id: i64,
        repository: &RepositoryRef,
        commits: Vec<CommitRecord>,
        update_sequence_id: i64,
    ) -> Self {
        Self {
            prevent_transitions: true,
            repositories: vec![RepositoryPayload {
                id: repository.id.clone(),
                name: repository.name.clone(),
                url: repository.url.clone(),
                commits,
                update_sequence_id,
            }],
            properties: PayloadProperties { installation_id },
        }
    }

    pub fn commit_count(&self) -> usize {
        self.repositories.iter().map(|r| r.commits.len()).sum()
    }

    pub fn commits(&self) -> impl Iterator<Item = &CommitRecord> {
        self.repositories.iter().flat_map(|r| r.commits.iter())
    }
}
