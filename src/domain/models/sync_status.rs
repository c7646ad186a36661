//! Per-repository sync state.
//!
//! Each repository of an installation carries one [`EntitySync`] per entity
//! type. The `(status, cursor)` pair is the externalized loop state of the
//! backfill: it is persisted before any continuation job is scheduled and the
//! next job rebuilds its position purely from it.

use serde::{Deserialize, Serialize};

/// Persisted status of one entity type of one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Complete,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "complete" | "completed" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Entity types tracked per repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Commits,
    Branches,
    Pulls,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [Self::Commits, Self::Branches, Self::Pulls];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commits => "commits",
            Self::Branches => "branches",
            Self::Pulls => "pulls",
        }
    }
}

/// State-machine phase derived from a persisted [`EntitySync`].
///
/// `NotStarted -> InProgress <-> InProgress -> Complete`, with `Failed`
/// reachable from `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    NotStarted,
    InProgress,
    Complete,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// Status and continuation cursor of one entity type.
///
/// Fields are private so that `complete` can never coexist with a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EntitySync {
    status: SyncStatus,
    cursor: Option<String>,
}

impl EntitySync {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn complete() -> Self {
        Self {
            status: SyncStatus::Complete,
            cursor: None,
        }
    }

    /// Rebuild from storage. A `complete` row with a leftover cursor is
    /// normalized to a cleared cursor.
    pub fn from_parts(status: SyncStatus, cursor: Option<String>) -> Self {
        let cursor = if status == SyncStatus::Complete {
            None
        } else {
            cursor
        };
        Self { status, cursor }
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn phase(&self) -> SyncPhase {
        match (self.status, &self.cursor) {
            (SyncStatus::Complete, _) => SyncPhase::Complete,
            (SyncStatus::Failed, _) => SyncPhase::Failed,
            (SyncStatus::Pending, None) => SyncPhase::NotStarted,
            (SyncStatus::Pending, Some(_)) => SyncPhase::InProgress,
        }
    }

    /// Record a processed page: keep `pending` and move to `next_cursor`.
    pub fn advance(&mut self, next_cursor: impl Into<String>) {
        self.status = SyncStatus::Pending;
        self.cursor = Some(next_cursor.into());
    }

    /// End of history reached.
    pub fn mark_complete(&mut self) {
        self.status = SyncStatus::Complete;
        self.cursor = None;
    }

    /// Unrecoverable failure. The cursor is kept so a redelivered job resumes
    /// from the last persisted page.
    pub fn mark_failed(&mut self) {
        self.status = SyncStatus::Failed;
    }

    /// Back to `pending` without moving the cursor (rate-limit wait).
    pub fn mark_pending(&mut self) {
        self.status = SyncStatus::Pending;
    }

    /// Operator resync: start over from the beginning of history.
    pub fn reset(&mut self) {
        self.status = SyncStatus::Pending;
        self.cursor = None;
    }
}

/// Identity of a repository as sent to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub url: String,
}

impl RepositoryRef {
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: owner.into(),
            url: url.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Sync record of one repository within one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSyncStatus {
    pub installation_id: i64,
    pub jira_host: String,
    pub repository: RepositoryRef,
    pub commits: EntitySync,
    pub branches: EntitySync,
    pub pulls: EntitySync,
}

impl RepoSyncStatus {
    /// Fresh record with every entity type pending from the start of history.
    pub fn new(installation_id: i64, jira_host: impl Into<String>, repository: RepositoryRef) -> Self {
        Self {
            installation_id,
            jira_host: jira_host.into(),
            repository,
            commits: EntitySync::pending(),
            branches: EntitySync::pending(),
            pulls: EntitySync::pending(),
        }
    }

    pub fn entity(&self, entity: EntityType) -> &EntitySync {
        match entity {
            EntityType::Commits => &self.commits,
            EntityType::Branches => &self.branches,
            EntityType::Pulls => &self.pulls,
        }
    }

    pub fn entity_mut(&mut self, entity: EntityType) -> &mut EntitySync {
        match entity {
            EntityType::Commits => &mut self.commits,
            EntityType::Branches => &mut self.branches,
            EntityType::Pulls => &mut self.pulls,
        }
    }
}
