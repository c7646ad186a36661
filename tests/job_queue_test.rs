//! Durable job queue semantics: delay, leasing, settlement.

use std::time::Duration;

use devsync::adapters::sqlite::{create_migrated_test_pool, SqliteJobQueue};
use devsync::domain::errors::DomainError;
use devsync::domain::models::{EnqueueOptions, JobPayload, QueueCounts, SyncJob};
use devsync::domain::ports::{JobConsumer, JobQueue};

const LEASE: Duration = Duration::from_secs(600);

async fn setup() -> (SqliteJobQueue, sqlx::SqlitePool) {
    let pool = create_migrated_test_pool().await.expect("Failed to create test pool");
    (SqliteJobQueue::new(pool.clone()), pool)
}

fn sync_job(repository_id: &str) -> JobPayload {
    JobPayload::Sync(SyncJob::for_repository(1234, "https://acme.atlassian.net", repository_id))
}

#[tokio::test]
async fn test_enqueue_then_claim() {
    let (queue, _pool) = setup().await;
    let id = queue.enqueue(sync_job("r1"), EnqueueOptions::default()).await.unwrap();

    let claimed = queue.claim_due(10, LEASE).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, id);
    assert_eq!(claimed[0].payload, sync_job("r1"));
    assert_eq!(claimed[0].attempts, 1);

    assert!(
        queue.claim_due(10, LEASE).await.unwrap().is_empty(),
        "a leased job is not handed out twice"
    );
    assert_eq!(
        queue.counts().await.unwrap(),
        QueueCounts {
            running: 1,
            ..QueueCounts::default()
        }
    );
}

#[tokio::test]
async fn test_delayed_job_is_not_due() {
    let (queue, _pool) = setup().await;
    queue
        .enqueue(sync_job("r1"), EnqueueOptions::delayed(Duration::from_secs(3600)))
        .await
        .unwrap();

    assert!(queue.claim_due(10, LEASE).await.unwrap().is_empty());
    assert_eq!(queue.pending(10).await.unwrap().len(), 1);
    assert_eq!(queue.counts().await.unwrap().queued, 1);
}

#[tokio::test]
async fn test_claim_respects_limit_and_order() {
    let (queue, _pool) = setup().await;
    for id in ["r1", "r2", "r3"] {
        queue.enqueue(sync_job(id), EnqueueOptions::default()).await.unwrap();
    }

    let first = queue.claim_due(2, LEASE).await.unwrap();
    assert_eq!(first.len(), 2);
    let rest = queue.claim_due(2, LEASE).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert!(queue.claim_due(0, LEASE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_lease_is_reclaimable() {
    let (queue, _pool) = setup().await;
    queue.enqueue(sync_job("r1"), EnqueueOptions::default()).await.unwrap();

    let first = queue.claim_due(1, Duration::ZERO).await.unwrap();
    assert_eq!(first.len(), 1);

    let again = queue.claim_due(1, LEASE).await.unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].id, first[0].id);
    assert_eq!(again[0].attempts, 2);
}

#[tokio::test]
async fn test_complete_removes_by_default() {
    let (queue, _pool) = setup().await;
    queue.enqueue(sync_job("r1"), EnqueueOptions::default()).await.unwrap();
    let job = queue.claim_due(1, LEASE).await.unwrap().remove(0);

    queue.complete(&job).await.unwrap();

    assert_eq!(queue.counts().await.unwrap(), QueueCounts::default());
    assert!(matches!(
        queue.complete(&job).await,
        Err(DomainError::JobNotFound(id)) if id == job.id
    ));
}

#[tokio::test]
async fn test_failed_job_kept_when_requested() {
    let (queue, pool) = setup().await;
    let options = EnqueueOptions {
        remove_on_fail: false,
        ..EnqueueOptions::default()
    };
    queue.enqueue(sync_job("r1"), options).await.unwrap();
    let job = queue.claim_due(1, LEASE).await.unwrap().remove(0);
    assert!(!job.remove_on_fail);

    queue.fail(&job, "tracker returned 400").await.unwrap();

    assert_eq!(queue.counts().await.unwrap().failed, 1);
    assert!(queue.pending(10).await.unwrap().is_empty());
    assert!(queue.claim_due(10, LEASE).await.unwrap().is_empty());

    let (error,): (Option<String>,) = sqlx::query_as("SELECT last_error FROM jobs WHERE id = ?")
        .bind(job.id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(error.as_deref(), Some("tracker returned 400"));
}

#[tokio::test]
async fn test_failed_job_removed_by_default() {
    let (queue, _pool) = setup().await;
    queue.enqueue(sync_job("r1"), EnqueueOptions::default()).await.unwrap();
    let job = queue.claim_due(1, LEASE).await.unwrap().remove(0);

    queue.fail(&job, "boom").await.unwrap();

    assert_eq!(queue.counts().await.unwrap(), QueueCounts::default());
}

#[tokio::test]
async fn test_undecodable_payload_is_discarded() {
    let (queue, pool) = setup().await;
    sqlx::query(
        "INSERT INTO jobs (id, kind, installation_id, payload, state, run_at, created_at)
         VALUES ('8d3c7a0e-7e43-4bb4-9a0c-0c6b1c2f9a11', 'sync', 1, 'not json', 'queued', 0, '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    queue.enqueue(sync_job("r1"), EnqueueOptions::default()).await.unwrap();

    let claimed = queue.claim_due(10, LEASE).await.unwrap();

    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].payload, sync_job("r1"));
    assert_eq!(
        queue.counts().await.unwrap(),
        QueueCounts {
            running: 1,
            ..QueueCounts::default()
        }
    );
}

#[tokio::test]
async fn test_outstanding_sync_detection() {
    const HOST: &str = "https://acme.atlassian.net";
    let (queue, _pool) = setup().await;
    assert!(!queue.has_outstanding_sync(1234, HOST, None).await.unwrap());

    queue.enqueue(sync_job("r1"), EnqueueOptions::default()).await.unwrap();
    assert!(queue.has_outstanding_sync(1234, HOST, Some("r1")).await.unwrap());
    assert!(!queue.has_outstanding_sync(1234, HOST, Some("r2")).await.unwrap());
    assert!(
        !queue.has_outstanding_sync(1234, HOST, None).await.unwrap(),
        "a repository job does not stand in for the whole installation"
    );

    queue
        .enqueue(
            JobPayload::Sync(SyncJob::for_installation(1234, HOST)),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();
    assert!(queue.has_outstanding_sync(1234, HOST, None).await.unwrap());
    assert!(queue.has_outstanding_sync(1234, HOST, Some("r2")).await.unwrap());
    assert!(!queue.has_outstanding_sync(1234, "https://other.atlassian.net", None).await.unwrap());
    assert!(!queue.has_outstanding_sync(99, HOST, None).await.unwrap());

    // Running jobs still count; settled ones do not.
    let claimed = queue.claim_due(10, LEASE).await.unwrap();
    assert!(queue.has_outstanding_sync(1234, HOST, None).await.unwrap());
    for job in &claimed {
        queue.complete(job).await.unwrap();
    }
    assert!(!queue.has_outstanding_sync(1234, HOST, Some("r1")).await.unwrap());
}
