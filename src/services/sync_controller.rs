//! Job continuation controller.
//!
//! Each [`SyncJob`] runs exactly one page cycle: fetch, translate, upload,
//! persist, then either enqueue the next job or finish. The repository row is
//! saved before any continuation is enqueued, so a later job always starts
//! from a durable cursor and pages of one repository are processed in order.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::domain::errors::{DomainError, SyncError, SyncResult};
use crate::domain::models::{
    EnqueueOptions, JobPayload, RepoSyncStatus, SyncJob, SyncStatus,
};
use crate::domain::ports::{JobQueue, SyncStateRepository};
use crate::services::backoff::{millis, InstallationBackoff};
use crate::services::batch_uploader::BatchUploader;
use crate::services::paginator::CursorPaginator;
use crate::services::translator::EntityTranslator;

/// What one page cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The installation was removed; nothing to do.
    InstallationGone,
    /// The job names a repository the installation no longer has.
    RepositoryGone { repository_id: String },
    /// Duplicate delivery for a repository that already finished.
    AlreadyComplete { repository_id: String },
    /// Installation-wide job with no pending repository left.
    Idle,
    /// Page processed; the next page is queued.
    Continued {
        repository_id: String,
        next_cursor: String,
        uploaded: usize,
        delay: Duration,
    },
    /// End of history reached for the repository.
    Completed {
        repository_id: String,
        uploaded: usize,
        next_repository_queued: bool,
    },
    /// Rate limited; the same cursor is queued again after `delay`.
    RateLimited { repository_id: String, delay: Duration },
    /// The repository was marked failed.
    Failed { repository_id: String, reason: String },
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstallationGone => "installation_gone",
            Self::RepositoryGone { .. } => "repository_gone",
            Self::AlreadyComplete { .. } => "already_complete",
            Self::Idle => "idle",
            Self::Continued { .. } => "continued",
            Self::Completed { .. } => "completed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Drives the self-requeuing backfill of commit history.
pub struct JobContinuationController {
    state: Arc<dyn SyncStateRepository>,
    queue: Arc<dyn JobQueue>,
    paginator: Arc<CursorPaginator>,
    translator: EntityTranslator,
    uploader: Arc<BatchUploader>,
    backoff: Arc<InstallationBackoff>,
}

enum Target {
    Found(RepoSyncStatus),
    Outcome(JobOutcome),
}

impl JobContinuationController {
    pub fn new(
        state: Arc<dyn SyncStateRepository>,
        queue: Arc<dyn JobQueue>,
        paginator: Arc<CursorPaginator>,
        translator: EntityTranslator,
        uploader: Arc<BatchUploader>,
        backoff: Arc<InstallationBackoff>,
    ) -> Self {
        Self {
            state,
            queue,
            paginator,
            translator,
            uploader,
            backoff,
        }
    }

    /// Run one page cycle for `job`.
    ///
    /// Sync failures are absorbed into [`JobOutcome::Failed`] or
    /// [`JobOutcome::RateLimited`]; only persistence and queue errors are
    /// returned as `Err`.
    #[instrument(
        skip(self, job),
        fields(
            installation_id = job.installation_id,
            jira_host = %job.jira_host,
            repository_id = job.repository_id.as_deref().unwrap_or("*")
        ),
        err
    )]
    pub async fn process(&self, job: &SyncJob) -> SyncResult<JobOutcome> {
        match self.cycle(job).await {
            Err(SyncError::InstallationGone { .. }) => {
                info!("installation removed mid-sync");
                Ok(JobOutcome::InstallationGone)
            }
            other => other,
        }
    }

    async fn cycle(&self, job: &SyncJob) -> SyncResult<JobOutcome> {
        let mut status = match self.select_target(job).await? {
            Target::Found(status) => status,
            Target::Outcome(outcome) => {
                info!(outcome = outcome.as_str(), "nothing to sync");
                return Ok(outcome);
            }
        };

        let repository_id = status.repository.id.clone();
        let cursor = status.commits.cursor().map(str::to_string);
        if job.cursor.is_some() && job.cursor != cursor {
            warn!(
                job_cursor = job.cursor.as_deref().unwrap_or_default(),
                persisted_cursor = cursor.as_deref().unwrap_or_default(),
                "stale job cursor ignored; resuming from persisted cursor"
            );
        }

        match self.run_page(job, &status, cursor.as_deref()).await {
            Ok((next_cursor, uploaded)) => {
                let delay = self.backoff.on_success(job.installation_id);
                match next_cursor {
                    Some(next_cursor) => {
                        status.commits.advance(next_cursor.clone());
                        self.save(&status).await?;
                        self.enqueue(job.clone().with_cursor(Some(next_cursor.clone())), delay)
                            .await?;
                        info!(uploaded, delay_ms = millis(delay), "page synced; continuing");
                        Ok(JobOutcome::Continued {
                            repository_id,
                            next_cursor,
                            uploaded,
                            delay,
                        })
                    }
                    None => {
                        status.commits.mark_complete();
                        self.save(&status).await?;
                        let next_repository_queued = self.queue_next_repository(job, delay).await?;
                        info!(uploaded, next_repository_queued, "commit history synced");
                        Ok(JobOutcome::Completed {
                            repository_id,
                            uploaded,
                            next_repository_queued,
                        })
                    }
                }
            }
            Err(err @ (SyncError::InstallationGone { .. } | SyncError::Persistence(_))) => Err(err),
            Err(err) if err.is_rate_limit() => {
                let delay = self.backoff.on_rate_limit(job.installation_id, err.retry_after());
                status.commits.mark_pending();
                self.save(&status).await?;
                self.enqueue(job.clone().with_cursor(cursor), delay).await?;
                warn!(delay_ms = millis(delay), error = %err, "rate limited; retrying same page later");
                Ok(JobOutcome::RateLimited { repository_id, delay })
            }
            Err(err) => {
                status.commits.mark_failed();
                self.save(&status).await?;
                error!(
                    repository = %status.repository.full_name(),
                    cursor = cursor.as_deref().unwrap_or_default(),
                    error = %err,
                    "commit sync failed"
                );
                // One failed repository does not hold up the rest of the installation.
                self.queue_next_repository(job, self.backoff.floor()).await?;
                Ok(JobOutcome::Failed {
                    repository_id,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Mark the job's repository failed, keeping its cursor. Used when a job
    /// is abandoned by the worker (timeout). An installation-wide job moves on
    /// to the next pending repository. Returns whether a row changed.
    #[instrument(skip(self, job), fields(installation_id = job.installation_id), err)]
    pub async fn mark_failed(&self, job: &SyncJob) -> SyncResult<bool> {
        let Target::Found(mut status) = self.select_target(job).await? else {
            return Ok(false);
        };
        status.commits.mark_failed();
        match self.save(&status).await {
            Err(SyncError::InstallationGone { .. }) => return Ok(false),
            other => other?,
        }
        let next_repository_queued = self.queue_next_repository(job, self.backoff.floor()).await?;
        warn!(
            repository = %status.repository.full_name(),
            next_repository_queued,
            "commit sync marked failed"
        );
        Ok(true)
    }

    /// Persist a record. A save rejected because the installation row is gone
    /// becomes [`SyncError::InstallationGone`].
    async fn save(&self, status: &RepoSyncStatus) -> SyncResult<()> {
        match self.state.save(status).await {
            Err(DomainError::InstallationNotFound {
                installation_id,
                jira_host,
            }) => Err(SyncError::InstallationGone {
                installation_id,
                jira_host,
            }),
            other => Ok(other?),
        }
    }

    async fn select_target(&self, job: &SyncJob) -> SyncResult<Target> {
        let Some(repositories) = self.state.load(job.installation_id, &job.jira_host).await? else {
            return Ok(Target::Outcome(JobOutcome::InstallationGone));
        };

        let target = match &job.repository_id {
            Some(repository_id) => {
                let Some(status) = repositories.into_iter().find(|r| &r.repository.id == repository_id)
                else {
                    return Ok(Target::Outcome(JobOutcome::RepositoryGone {
                        repository_id: repository_id.clone(),
                    }));
                };
                if status.commits.status() == SyncStatus::Complete {
                    return Ok(Target::Outcome(JobOutcome::AlreadyComplete {
                        repository_id: repository_id.clone(),
                    }));
                }
                status
            }
            None => match repositories
                .into_iter()
                .find(|r| r.commits.status() == SyncStatus::Pending)
            {
                Some(status) => status,
                None => return Ok(Target::Outcome(JobOutcome::Idle)),
            },
        };
        Ok(Target::Found(target))
    }

    /// Fetch, translate and upload one page. Returns the cursor to continue
    /// from (`None` at end of history) and the number of commits uploaded.
    async fn run_page(
        &self,
        job: &SyncJob,
        status: &RepoSyncStatus,
        cursor: Option<&str>,
    ) -> SyncResult<(Option<String>, usize)> {
        let repository = &status.repository;
        let page = self
            .paginator
            .next_page(job.installation_id, repository, cursor)
            .await?;

        let records = self.translator.translate_page(&page.records);
        let report = self
            .uploader
            .upload(job.installation_id, &job.jira_host, repository, records)
            .await?;

        let next_cursor = if page.has_more {
            Some(page.next_cursor.ok_or_else(|| {
                SyncError::FetchFailed("page reports more history but carries no cursor".to_string())
            })?)
        } else {
            None
        };
        Ok((next_cursor, report.commits))
    }

    /// Installation-wide jobs move on to the next pending repository.
    async fn queue_next_repository(&self, job: &SyncJob, delay: Duration) -> SyncResult<bool> {
        if !job.is_installation_wide() {
            return Ok(false);
        }
        let pending = self
            .state
            .load(job.installation_id, &job.jira_host)
            .await?
            .is_some_and(|repos| repos.iter().any(|r| r.commits.status() == SyncStatus::Pending));
        if pending {
            self.enqueue(SyncJob::for_installation(job.installation_id, job.jira_host.clone()), delay)
                .await?;
        }
        Ok(pending)
    }

    async fn enqueue(&self, job: SyncJob, delay: Duration) -> SyncResult<()> {
        self.queue
            .enqueue(JobPayload::Sync(job), EnqueueOptions::delayed(delay))
            .await?;
        Ok(())
    }
}
