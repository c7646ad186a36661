//! Push-event handling: queue the keyed commits of a push, then sync them.

use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::SyncResult;
use crate::domain::models::{PushJob, PushedCommit, RepositoryRef};
use crate::domain::ports::{CommitSource, SyncStateRepository};
use crate::services::batch_uploader::{BatchUploader, UploadReport};
use crate::services::smart_commit::extract_issue_keys;
use crate::services::translator::EntityTranslator;

/// The parts of a source-host push webhook the processor reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub installation: PushInstallation,
    pub repository: PushRepository,
    #[serde(default)]
    pub commits: Vec<PushEventCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushInstallation {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub id: serde_json::Value,
    pub name: String,
    pub html_url: String,
    pub owner: PushOwner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushOwner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEventCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
}

impl PushRepository {
    fn to_ref(&self) -> RepositoryRef {
        let id = match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        RepositoryRef::new(id, self.owner.login.clone(), self.name.clone(), self.html_url.clone())
    }
}

/// Build the queued job for a push. Only commits whose message carries issue
/// keys are kept, and only their SHA and keys are stored. Returns `None` when
/// no commit qualifies.
pub fn create_push_job(event: &PushEvent, jira_host: &str) -> Option<PushJob> {
    let shas: Vec<PushedCommit> = event
        .commits
        .iter()
        .filter_map(|commit| {
            let issue_keys = extract_issue_keys(&commit.message);
            (!issue_keys.is_empty()).then(|| PushedCommit {
                id: commit.id.clone(),
                issue_keys,
            })
        })
        .collect();

    if shas.is_empty() {
        return None;
    }
    Some(PushJob {
        installation_id: event.installation.id,
        jira_host: jira_host.to_string(),
        repository: event.repository.to_ref(),
        shas,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    InstallationGone,
    Uploaded(UploadReport),
}

/// Fetches full detail of queued push commits and uploads them.
pub struct PushProcessor {
    state: Arc<dyn SyncStateRepository>,
    source: Arc<dyn CommitSource>,
    translator: EntityTranslator,
    uploader: Arc<BatchUploader>,
}

impl PushProcessor {
    pub fn new(
        state: Arc<dyn SyncStateRepository>,
        source: Arc<dyn CommitSource>,
        translator: EntityTranslator,
        uploader: Arc<BatchUploader>,
    ) -> Self {
        Self {
            state,
            source,
            translator,
            uploader,
        }
    }

    /// Commits are fetched concurrently; any fetch failure fails the job, an
    /// untranslatable commit is dropped.
    /// Issue keys come from the job, not from the refetched message.
    #[instrument(
        skip(self, job),
        fields(
            installation_id = job.installation_id,
            repository = %job.repository.full_name(),
            shas = job.shas.len()
        ),
        err
    )]
    pub async fn process(&self, job: &PushJob) -> SyncResult<PushOutcome> {
        if self.state.load(job.installation_id, &job.jira_host).await?.is_none() {
            info!("installation removed; dropping push");
            return Ok(PushOutcome::InstallationGone);
        }

        let fetched = join_all(job.shas.iter().map(|sha| {
            self.source
                .get_commit(job.installation_id, &job.repository, &sha.id)
        }))
        .await;

        let mut records = Vec::with_capacity(fetched.len());
        for (sha, commit) in job.shas.iter().zip(fetched) {
            match self.translator.translate_with_keys(&commit?, sha.issue_keys.clone()) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(sha = %sha.id, "pushed commit has no issue keys; skipping"),
                Err(err) => warn!(sha = %sha.id, error = %err, "dropping untranslatable pushed commit"),
            }
        }

        let report = self
            .uploader
            .upload(job.installation_id, &job.jira_host, &job.repository, records)
            .await?;
        Ok(PushOutcome::Uploaded(report))
    }
}
