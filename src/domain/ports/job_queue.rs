use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{EnqueueOptions, JobPayload, QueueCounts, QueuedJob};

/// Port for the delayed job queue.
///
/// Only at-least-once delivery and a delay are assumed.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: JobPayload, options: EnqueueOptions) -> DomainResult<Uuid>;
}

/// Consumer side of the queue, used by the worker pool.
#[async_trait]
pub trait JobConsumer: JobQueue {
    /// Lease up to `limit` due jobs. A job whose lease expires without being
    /// settled becomes claimable again.
    async fn claim_due(&self, limit: usize, lease: Duration) -> DomainResult<Vec<QueuedJob>>;

    async fn complete(&self, job: &QueuedJob) -> DomainResult<()>;

    async fn fail(&self, job: &QueuedJob, error: &str) -> DomainResult<()>;

    async fn counts(&self) -> DomainResult<QueueCounts>;
}
