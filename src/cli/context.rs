//! Wiring shared by commands: configuration, database and the sync engine.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::github::GithubClient;
use crate::adapters::jira::JiraDevInfoClient;
use crate::adapters::sqlite::{
    initialize_database, SqliteJobQueue, SqliteProjectRepository, SqliteSyncStateRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::SystemClock;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    BatchUploader, CursorPaginator, EntityTranslator, InstallationBackoff, JobContinuationController,
    PushProcessor, WorkerPool,
};

/// Load configuration from `path`, or from the project-local hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub state: Arc<SqliteSyncStateRepository>,
    pub queue: Arc<SqliteJobQueue>,
    pub projects: Arc<SqliteProjectRepository>,
}

impl AppContext {
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .context("Failed to initialize database. Run 'devsync init' first.")?;

        Ok(Self {
            state: Arc::new(SqliteSyncStateRepository::new(pool.clone())),
            queue: Arc::new(SqliteJobQueue::new(pool.clone())),
            projects: Arc::new(SqliteProjectRepository::new(pool.clone())),
            pool,
            config,
        })
    }

    /// Assemble the worker pool with its HTTP adapters.
    pub fn worker_pool(&self) -> Result<WorkerPool> {
        let config = &self.config;
        let source = Arc::new(GithubClient::from_config(&config.source).context("Failed to build GitHub client")?);
        let tracker =
            Arc::new(JiraDevInfoClient::from_config(&config.tracker).context("Failed to build tracker client")?);

        let translator = EntityTranslator::from_config(&config.source, &config.sync);
        let backoff = Arc::new(InstallationBackoff::from_config(&config.sync));
        let uploader = Arc::new(BatchUploader::new(
            tracker,
            self.projects.clone(),
            Arc::new(SystemClock),
            config.sync.chunk_size,
        ));
        let paginator = Arc::new(CursorPaginator::new(
            source.clone(),
            config.source.page_size,
            config.sync.default_branch.clone(),
        ));

        let controller = Arc::new(JobContinuationController::new(
            self.state.clone(),
            self.queue.clone(),
            paginator,
            translator.clone(),
            uploader.clone(),
            backoff.clone(),
        ));
        let push = Arc::new(PushProcessor::new(self.state.clone(), source, translator, uploader));

        Ok(WorkerPool::new(
            self.queue.clone(),
            controller,
            push,
            backoff,
            config.worker.clone(),
        ))
    }
}
