//! Common test utilities for integration tests
//!
//! In-memory fakes for every port plus builders for commits and a fully
//! wired controller.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use devsync::domain::errors::{DomainError, DomainResult, SyncError, SyncResult};
use devsync::domain::models::{
    DevInfoPayload, EnqueueOptions, Installation, InstallationSummary, JobPayload, Page, RepoSyncStatus,
    RepositoryRef, SourceCommit, SourceFile, SyncJob,
};
use devsync::domain::ports::{
    Clock, CommitSource, DevInfoClient, JobQueue, ProjectOccurrenceCounter, SyncStateRepository,
};
use devsync::services::{
    BatchUploader, CursorPaginator, EntityTranslator, InstallationBackoff, JobContinuationController,
};

pub const JIRA_HOST: &str = "https://acme.atlassian.net";
pub const INSTALLATION_ID: i64 = 1234;
pub const FLOOR: Duration = Duration::from_millis(1000);
pub const CAP: Duration = Duration::from_millis(60_000);

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn repo(id: &str, name: &str) -> RepositoryRef {
    RepositoryRef::new(id, "octo", name, format!("https://github.com/octo/{name}"))
}

pub fn commit(sha: &str, message: &str) -> SourceCommit {
    SourceCommit {
        oid: sha.to_string(),
        message: message.to_string(),
        url: format!("https://github.com/octo/widgets/commit/{sha}"),
        authored_date: "2024-03-01T10:00:00Z".to_string(),
        author_name: "Alice".to_string(),
        author_email: "alice@example.com".to_string(),
        author_login: Some("alice".to_string()),
        parent_count: 1,
        files: vec![SourceFile {
            filename: "a.txt".to_string(),
            status: "modified".to_string(),
            additions: 1,
            deletions: 0,
            blob_url: format!("https://github.com/octo/widgets/blob/{sha}/a.txt"),
        }],
        file_count: 1,
    }
}

/// `count` keyed commits with distinct 40-char hashes.
pub fn keyed_commits(prefix: &str, count: usize) -> Vec<SourceCommit> {
    (0..count)
        .map(|n| commit(&format!("{prefix}{n:0>39}")[..40], &format!("TES-{n} work")))
        .collect()
}

/// Scripted response of one history request.
#[derive(Debug, Clone)]
pub enum Step {
    Page(Page<SourceCommit>),
    RateLimited(Option<Duration>),
    Fail(String),
}

impl Step {
    pub fn page(records: Vec<SourceCommit>, next_cursor: Option<&str>) -> Self {
        Self::Page(Page::new(records, next_cursor.map(str::to_string), next_cursor.is_some()))
    }

    fn into_result(self) -> SyncResult<Page<SourceCommit>> {
        match self {
            Self::Page(page) => Ok(page),
            Self::RateLimited(retry_after) => Err(SyncError::RateLimited { retry_after }),
            Self::Fail(message) => Err(SyncError::FetchFailed(message)),
        }
    }
}

/// History keyed by `(repository id, cursor)`. Each key holds a queue of
/// steps; the last one repeats.
#[derive(Default)]
pub struct FakeSource {
    pub default_branch: Option<String>,
    history: Mutex<HashMap<(String, Option<String>), VecDeque<Step>>>,
    commits: Mutex<HashMap<String, SyncResult<SourceCommit>>>,
    pub requests: Mutex<Vec<(String, String, Option<String>)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            default_branch: Some("main".to_string()),
            ..Self::default()
        }
    }

    pub fn script(&self, repository_id: &str, cursor: Option<&str>, step: Step) -> &Self {
        self.history
            .lock()
            .unwrap()
            .entry((repository_id.to_string(), cursor.map(str::to_string)))
            .or_default()
            .push_back(step);
        self
    }

    pub fn add_commit(&self, commit: SourceCommit) {
        self.add_commit_as(&commit.oid.clone(), commit);
    }

    /// Serve `commit` for `sha` even when its own hash differs.
    pub fn add_commit_as(&self, sha: &str, commit: SourceCommit) {
        self.commits.lock().unwrap().insert(sha.to_string(), Ok(commit));
    }

    pub fn fail_commit(&self, sha: &str, err: SyncError) {
        self.commits.lock().unwrap().insert(sha.to_string(), Err(err));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CommitSource for FakeSource {
    async fn default_branch(&self, _: i64, _: &RepositoryRef) -> SyncResult<Option<String>> {
        Ok(self.default_branch.clone())
    }

    async fn history_page(
        &self,
        _: i64,
        repository: &RepositoryRef,
        branch: &str,
        cursor: Option<&str>,
        _: u32,
    ) -> SyncResult<Page<SourceCommit>> {
        self.requests.lock().unwrap().push((
            repository.id.clone(),
            branch.to_string(),
            cursor.map(str::to_string),
        ));
        let mut history = self.history.lock().unwrap();
        let steps = history
            .get_mut(&(repository.id.clone(), cursor.map(str::to_string)))
            .ok_or_else(|| SyncError::FetchFailed(format!("no page scripted for {cursor:?}")))?;
        let step = if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap()
        };
        step.into_result()
    }

    async fn get_commit(&self, _: i64, _: &RepositoryRef, sha: &str) -> SyncResult<SourceCommit> {
        let entry = self.commits.lock().unwrap().remove(sha);
        match entry {
            Some(Ok(commit)) => {
                self.commits.lock().unwrap().insert(sha.to_string(), Ok(commit.clone()));
                Ok(commit)
            }
            Some(Err(err)) => Err(err),
            None => Err(SyncError::FetchFailed(format!("unknown commit {sha}"))),
        }
    }
}

/// Records every accepted payload. Queued failures are returned first.
#[derive(Default)]
pub struct RecordingTracker {
    pub payloads: Mutex<Vec<(String, DevInfoPayload)>>,
    failures: Mutex<VecDeque<SyncError>>,
}

impl RecordingTracker {
    pub fn fail_next(&self, err: SyncError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn payloads(&self) -> Vec<DevInfoPayload> {
        self.payloads.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn upload_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }
}

#[async_trait]
impl DevInfoClient for RecordingTracker {
    async fn upload(&self, jira_host: &str, payload: &DevInfoPayload) -> SyncResult<()> {
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.payloads
            .lock()
            .unwrap()
            .push((jira_host.to_string(), payload.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCounter {
    counts: Mutex<HashMap<(String, String), i64>>,
}

impl MemoryCounter {
    pub fn total(&self) -> i64 {
        self.counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ProjectOccurrenceCounter for MemoryCounter {
    async fn increment(&self, project_key: &str, base_url: &str) -> DomainResult<()> {
        *self
            .counts
            .lock()
            .unwrap()
            .entry((project_key.to_string(), base_url.to_string()))
            .or_default() += 1;
        Ok(())
    }

    async fn occurrences(&self, project_key: &str, base_url: &str) -> DomainResult<i64> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(&(project_key.to_string(), base_url.to_string()))
            .copied()
            .unwrap_or(0))
    }
}

/// Sync state keyed by installation, repositories kept in insertion order.
#[derive(Default)]
pub struct MemoryState {
    installations: Mutex<HashMap<(i64, String), Vec<RepoSyncStatus>>>,
    pub saves: Mutex<Vec<RepoSyncStatus>>,
}

impl MemoryState {
    pub fn status(&self, repository_id: &str) -> RepoSyncStatus {
        self.installations
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|s| s.repository.id == repository_id)
            .cloned()
            .expect("repository tracked")
    }

    /// Overwrite a record without counting it as a save.
    pub fn put(&self, status: RepoSyncStatus) {
        let mut installations = self.installations.lock().unwrap();
        let repos = installations
            .get_mut(&(status.installation_id, status.jira_host.clone()))
            .expect("installation exists");
        if let Some(existing) = repos.iter_mut().find(|r| r.repository.id == status.repository.id) {
            *existing = status;
        }
    }
}

#[async_trait]
impl SyncStateRepository for MemoryState {
    async fn load(&self, installation_id: i64, jira_host: &str) -> DomainResult<Option<Vec<RepoSyncStatus>>> {
        Ok(self
            .installations
            .lock()
            .unwrap()
            .get(&(installation_id, jira_host.to_string()))
            .cloned())
    }

    async fn save(&self, status: &RepoSyncStatus) -> DomainResult<()> {
        let mut installations = self.installations.lock().unwrap();
        let repos = installations
            .get_mut(&(status.installation_id, status.jira_host.clone()))
            .ok_or_else(|| DomainError::InstallationNotFound {
                installation_id: status.installation_id,
                jira_host: status.jira_host.clone(),
            })?;
        match repos.iter_mut().find(|r| r.repository.id == status.repository.id) {
            Some(existing) => *existing = status.clone(),
            None => repos.push(status.clone()),
        }
        self.saves.lock().unwrap().push(status.clone());
        Ok(())
    }

    async fn add_installation(&self, installation: &Installation) -> DomainResult<()> {
        let mut installations = self.installations.lock().unwrap();
        let repos = installations
            .entry((installation.installation_id, installation.jira_host.clone()))
            .or_default();
        for repository in &installation.repositories {
            if !repos.iter().any(|r| r.repository.id == repository.id) {
                repos.push(RepoSyncStatus::new(
                    installation.installation_id,
                    installation.jira_host.clone(),
                    repository.clone(),
                ));
            }
        }
        Ok(())
    }

    async fn remove_installation(&self, installation_id: i64, jira_host: &str) -> DomainResult<bool> {
        Ok(self
            .installations
            .lock()
            .unwrap()
            .remove(&(installation_id, jira_host.to_string()))
            .is_some())
    }

    async fn list_installations(&self) -> DomainResult<Vec<InstallationSummary>> {
        Ok(self
            .installations
            .lock()
            .unwrap()
            .iter()
            .map(|((id, host), repos)| InstallationSummary {
                installation_id: *id,
                jira_host: host.clone(),
                repository_count: i64::try_from(repos.len()).unwrap(),
                created_at: String::new(),
            })
            .collect())
    }

    async fn reset(&self, installation_id: i64, jira_host: &str, repository_id: Option<&str>) -> DomainResult<u64> {
        let mut installations = self.installations.lock().unwrap();
        let repos = installations
            .get_mut(&(installation_id, jira_host.to_string()))
            .ok_or_else(|| DomainError::InstallationNotFound {
                installation_id,
                jira_host: jira_host.to_string(),
            })?;
        let mut reset = 0;
        for repo in repos
            .iter_mut()
            .filter(|r| !matches!(repository_id, Some(id) if r.repository.id != id))
        {
            repo.commits.reset();
            reset += 1;
        }
        Ok(reset)
    }
}

/// Queue that only records what was enqueued.
#[derive(Default)]
pub struct RecordingQueue {
    pub jobs: Mutex<Vec<(JobPayload, EnqueueOptions)>>,
}

impl RecordingQueue {
    pub fn sync_jobs(&self) -> Vec<(SyncJob, Duration)> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(payload, options)| match payload {
                JobPayload::Sync(job) => Some((job.clone(), options.delay)),
                JobPayload::Push(_) => None,
            })
            .collect()
    }

    pub fn take(&self) -> Vec<(JobPayload, EnqueueOptions)> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, job: JobPayload, options: EnqueueOptions) -> DomainResult<Uuid> {
        self.jobs.lock().unwrap().push((job, options));
        Ok(Uuid::new_v4())
    }
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Controller wired to in-memory fakes.
pub struct Harness {
    pub source: Arc<FakeSource>,
    pub tracker: Arc<RecordingTracker>,
    pub counter: Arc<MemoryCounter>,
    pub state: Arc<MemoryState>,
    pub queue: Arc<RecordingQueue>,
    pub backoff: Arc<InstallationBackoff>,
    pub uploader: Arc<BatchUploader>,
    pub controller: JobContinuationController,
}

impl Harness {
    pub fn new(source: FakeSource) -> Self {
        let source = Arc::new(source);
        let tracker = Arc::new(RecordingTracker::default());
        let counter = Arc::new(MemoryCounter::default());
        let state = Arc::new(MemoryState::default());
        let queue = Arc::new(RecordingQueue::default());
        let backoff = Arc::new(InstallationBackoff::new(FLOOR, CAP));
        let uploader = Arc::new(BatchUploader::new(
            tracker.clone(),
            counter.clone(),
            Arc::new(FixedClock(1_700_000_000_000)),
            400,
        ));
        let controller = JobContinuationController::new(
            state.clone(),
            queue.clone(),
            Arc::new(CursorPaginator::new(source.clone(), 20, "master")),
            EntityTranslator::new("https://github.com", 10),
            uploader.clone(),
            backoff.clone(),
        );
        Self {
            source,
            tracker,
            counter,
            state,
            queue,
            backoff,
            uploader,
            controller,
        }
    }

    pub async fn install(&self, repositories: &[RepositoryRef]) {
        let installation = repositories
            .iter()
            .cloned()
            .fold(Installation::new(INSTALLATION_ID, JIRA_HOST), Installation::with_repository);
        self.state.add_installation(&installation).await.unwrap();
    }
}

pub fn repository_job(repository_id: &str, cursor: Option<&str>) -> SyncJob {
    SyncJob::for_repository(INSTALLATION_ID, JIRA_HOST, repository_id).with_cursor(cursor.map(str::to_string))
}

pub fn installation_job() -> SyncJob {
    SyncJob::for_installation(INSTALLATION_ID, JIRA_HOST)
}
