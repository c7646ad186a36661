//! Chunked upload of translated commits to the tracker.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::SyncResult;
use crate::domain::models::{CommitRecord, DevInfoPayload, RepositoryRef, MAX_COMMITS_PER_REQUEST};
use crate::domain::ports::{Clock, DevInfoClient, ProjectOccurrenceCounter};
use crate::services::smart_commit::reduce_project_keys;

/// Result of one upload call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadReport {
    pub chunks: usize,
    pub commits: usize,
    /// Shared by every chunk and commit of the call; `0` when nothing was sent.
    pub update_sequence_id: i64,
}

/// Splits commits into tracker-sized chunks and submits them in order.
pub struct BatchUploader {
    client: Arc<dyn DevInfoClient>,
    counter: Arc<dyn ProjectOccurrenceCounter>,
    clock: Arc<dyn Clock>,
    chunk_size: usize,
    last_sequence_id: AtomicI64,
}

impl BatchUploader {
    pub fn new(
        client: Arc<dyn DevInfoClient>,
        counter: Arc<dyn ProjectOccurrenceCounter>,
        clock: Arc<dyn Clock>,
        chunk_size: usize,
    ) -> Self {
        Self {
            client,
            counter,
            clock,
            chunk_size: chunk_size.clamp(1, MAX_COMMITS_PER_REQUEST),
            last_sequence_id: AtomicI64::new(0),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Upload `commits` for one repository.
    ///
    /// Chunks go out in order. The first failing chunk stops the call and its
    /// error is returned; chunks already accepted stay accepted. Project
    /// counters are bumped once per distinct project after each accepted chunk.
    #[instrument(
        skip(self, repository, commits),
        fields(repository = %repository.full_name(), commits = commits.len()),
        err
    )]
    pub async fn upload(
        &self,
        installation_id: i64,
        jira_host: &str,
        repository: &RepositoryRef,
        mut commits: Vec<CommitRecord>,
    ) -> SyncResult<UploadReport> {
        if commits.is_empty() {
            debug!("nothing to upload");
            return Ok(UploadReport::default());
        }

        let update_sequence_id = self.next_sequence_id();
        for commit in &mut commits {
            commit.update_sequence_id = update_sequence_id;
        }

        let mut report = UploadReport {
            update_sequence_id,
            ..UploadReport::default()
        };
        for (index, chunk) in commits.chunks(self.chunk_size).enumerate() {
            let payload =
                DevInfoPayload::for_chunk(installation_id, repository, chunk.to_vec(), update_sequence_id);

            if let Err(err) = self.client.upload(jira_host, &payload).await {
                warn!(
                    chunk = index,
                    accepted_chunks = report.chunks,
                    error = %err,
                    "chunk upload failed; stopping"
                );
                return Err(err);
            }

            report.chunks += 1;
            report.commits += chunk.len();
            self.count_projects(jira_host, chunk).await;
        }

        info!(
            chunks = report.chunks,
            update_sequence_id, "uploaded commits"
        );
        Ok(report)
    }

    /// Millisecond clock reading that never goes below a previously issued id.
    fn next_sequence_id(&self) -> i64 {
        let now = self.clock.now_millis();
        let previous = self.last_sequence_id.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }

    async fn count_projects(&self, jira_host: &str, chunk: &[CommitRecord]) {
        let projects = reduce_project_keys(chunk.iter().flat_map(|c| c.issue_keys.iter()));
        for project in projects {
            if let Err(err) = self.counter.increment(&project, jira_host).await {
                warn!(project = %project, error = %err, "failed to bump project occurrence");
            }
        }
    }
}
