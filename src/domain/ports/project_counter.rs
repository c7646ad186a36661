use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Port for the per-project occurrence counter.
///
/// Calls are fire-and-forget from the sync engine's perspective: failures are
/// logged by the caller and never retried.
#[async_trait]
pub trait ProjectOccurrenceCounter: Send + Sync {
    async fn increment(&self, project_key: &str, base_url: &str) -> DomainResult<()>;

    /// Current count, `0` for unseen projects.
    async fn occurrences(&self, project_key: &str, base_url: &str) -> DomainResult<i64>;
}
