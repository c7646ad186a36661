//! devsync - resumable commit-history sync from GitHub into Jira
//!
//! devsync backfills the commit history of every repository of a linked
//! installation into the tracker's development-information store. The crawl
//! is a chain of small queued jobs: each one fetches one page of history,
//! uploads the commits that reference issues, persists the cursor and queues
//! its successor.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): paging, translation, upload, backoff and
//!   the job continuation controller
//! - **Adapters** (`adapters`): GitHub, Jira and SQLite implementations of
//!   the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult, SyncError, SyncResult};
pub use domain::models::{
    CommitRecord, Config, EnqueueOptions, Installation, JobPayload, Page, RepoSyncStatus, RepositoryRef,
    SourceCommit, SyncJob, SyncStatus,
};
pub use domain::ports::{Clock, CommitSource, DevInfoClient, JobQueue, ProjectOccurrenceCounter, SyncStateRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BatchUploader, CursorPaginator, EntityTranslator, InstallationBackoff, JobContinuationController, JobOutcome,
    WorkerPool,
};
