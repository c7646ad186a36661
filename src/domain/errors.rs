//! Domain errors for the devsync sync engine.

use std::time::Duration;
use thiserror::Error;

/// Persistence-level errors raised by repository adapters.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Installation not found: {installation_id} on {jira_host}")]
    InstallationNotFound { installation_id: i64, jira_host: String },

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Queued job not found: {0}")]
    JobNotFound(uuid::Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Failure taxonomy of one sync page cycle.
///
/// `RateLimited` drives backoff; every other variant marks the repository
/// failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Source host unreachable, errored, or returned a malformed page.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// Source host or tracker signalled a rate limit.
    #[error("Rate limited{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// A single source record could not be translated.
    #[error("Translate error: {0}")]
    TranslateError(String),

    /// Tracker rejected or could not be reached for a chunk.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// The installation the job targets no longer exists.
    #[error("Installation {installation_id} on {jira_host} no longer exists")]
    InstallationGone { installation_id: i64, jira_host: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] DomainError),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(" (retry after {}s)", d.as_secs()))
        .unwrap_or_default()
}

impl SyncError {
    /// True for signals that should escalate backoff rather than fail the sync.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SyncError::RateLimited { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
