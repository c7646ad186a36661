//! Queue job payloads.
//!
//! Payloads are serialized camelCase so queued rows stay readable next to the
//! tracker payloads they produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::sync_status::RepositoryRef;

/// One page-cycle of a backfill.
///
/// `repository_id == None` makes the job installation-wide: the controller
/// picks the next pending repository itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub installation_id: i64,
    pub jira_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl SyncJob {
    pub fn for_installation(installation_id: i64, jira_host: impl Into<String>) -> Self {
        Self {
            installation_id,
            jira_host: jira_host.into(),
            repository_id: None,
            cursor: None,
        }
    }

    pub fn for_repository(
        installation_id: i64,
        jira_host: impl Into<String>,
        repository_id: impl Into<String>,
    ) -> Self {
        Self {
            installation_id,
            jira_host: jira_host.into(),
            repository_id: Some(repository_id.into()),
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn is_installation_wide(&self) -> bool {
        self.repository_id.is_none()
    }
}

/// A pushed commit worth syncing: only the SHA and its keys are queued, the
/// rest is fetched when the job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushedCommit {
    pub id: String,
    pub issue_keys: Vec<String>,
}

/// Commits of one push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushJob {
    pub installation_id: i64,
    pub jira_host: String,
    pub repository: RepositoryRef,
    pub shas: Vec<PushedCommit>,
}

/// Everything the durable queue can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    Sync(SyncJob),
    Push(PushJob),
}

impl JobPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Push(_) => "push",
        }
    }

    pub fn installation_id(&self) -> i64 {
        match self {
            Self::Sync(job) => job.installation_id,
            Self::Push(job) => job.installation_id,
        }
    }
}

/// Options accompanying an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub delay: Duration,
    pub remove_on_fail: bool,
    pub remove_on_complete: bool,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            remove_on_fail: true,
            remove_on_complete: true,
        }
    }
}

impl EnqueueOptions {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

/// Lifecycle of a row in the durable queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A job claimed from the durable queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub id: Uuid,
    pub payload: JobPayload,
    pub run_at: DateTime<Utc>,
    /// Deliveries so far, including the current one.
    pub attempts: u32,
    pub remove_on_fail: bool,
    pub remove_on_complete: bool,
}

/// Row counts per queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub queued: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_job_wire_shape() {
        let job = SyncJob::for_repository(1234, "https://acme.atlassian.net", "r-1")
            .with_cursor(Some("abc 20".to_string()));
        let json = serde_json::to_value(JobPayload::Sync(job)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "sync",
                "installationId": 1234,
                "jiraHost": "https://acme.atlassian.net",
                "repositoryId": "r-1",
                "cursor": "abc 20"
            })
        );
    }

    #[test]
    fn test_installation_wide_job_omits_repository() {
        let job = SyncJob::for_installation(5, "https://acme.atlassian.net");
        assert!(job.is_installation_wide());
        let json = serde_json::to_string(&job).unwrap();
        assert!(!json.contains("repositoryId"));
        let back: SyncJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_job_state_round_trip() {
        for state in [JobState::Queued, JobState::Running, JobState::Completed, JobState::Failed] {
            assert_eq!(JobState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(JobState::from_str("paused"), None);
    }

    #[test]
    fn test_default_options_remove_rows() {
        let opts = EnqueueOptions::delayed(Duration::from_secs(2));
        assert_eq!(opts.delay, Duration::from_secs(2));
        assert!(opts.remove_on_fail);
        assert!(opts.remove_on_complete);
    }
}
