//! Domain models.

pub mod commit;
pub mod config;
pub mod devinfo;
pub mod installation;
pub mod job;
pub mod page;
pub mod sync_status;

pub use commit::{
    ChangeType, CommitAuthor, CommitFile, CommitFlag, CommitRecord, SourceCommit, SourceFile,
};
pub use config::{
    Config, DatabaseConfig, LoggingConfig, SourceConfig, SyncConfig, TrackerConfig, WorkerConfig,
};
pub use devinfo::{
    DevInfoPayload, PayloadProperties, RepositoryPayload, MAX_COMMITS_PER_REQUEST,
    MAX_FILES_PER_COMMIT,
};
pub use installation::{Installation, InstallationSummary};
pub use job::{
    EnqueueOptions, JobPayload, JobState, PushJob, PushedCommit, QueueCounts, QueuedJob, SyncJob,
};
pub use page::Page;
pub use sync_status::{EntitySync, EntityType, RepoSyncStatus, RepositoryRef, SyncPhase, SyncStatus};
