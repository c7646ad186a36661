//! Durable delayed job queue on SQLite.
//!
//! Claiming is a single `UPDATE ... RETURNING`, so two workers never lease the
//! same row. A leased row whose lease expires is claimable again, which gives
//! at-least-once delivery across crashes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{EnqueueOptions, JobPayload, JobState, QueueCounts, QueuedJob};
use crate::domain::ports::{JobConsumer, JobQueue};

#[derive(Clone)]
pub struct SqliteJobQueue {
    pool: SqlitePool,
}

impl SqliteJobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Jobs not yet settled, earliest first.
    pub async fn pending(&self, limit: i64) -> DomainResult<Vec<QueuedJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT id, payload, run_at, attempts, remove_on_fail, remove_on_complete FROM jobs
             WHERE state IN ('queued', 'running') ORDER BY run_at, created_at LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Whether an unsettled sync job already covers the target: an
    /// installation-wide job covers every repository, a repository job only
    /// its own. `repository_id = None` asks about an installation-wide job.
    pub async fn has_outstanding_sync(
        &self,
        installation_id: i64,
        jira_host: &str,
        repository_id: Option<&str>,
    ) -> DomainResult<bool> {
        let payloads: Vec<(String,)> = sqlx::query_as(
            "SELECT payload FROM jobs
             WHERE kind = 'sync' AND installation_id = ? AND state IN ('queued', 'running')",
        )
        .bind(installation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payloads
            .iter()
            .filter_map(|(payload,)| match serde_json::from_str(payload) {
                Ok(JobPayload::Sync(job)) => Some(job),
                _ => None,
            })
            .filter(|job| job.jira_host == jira_host)
            .any(|job| match (&job.repository_id, repository_id) {
                (None, _) => true,
                (Some(queued), Some(wanted)) => queued == wanted,
                (Some(_), None) => false,
            }))
    }

    async fn settle(&self, job: &QueuedJob, state: JobState, remove: bool, error: Option<&str>) -> DomainResult<()> {
        let result = if remove {
            sqlx::query("DELETE FROM jobs WHERE id = ?")
                .bind(job.id.to_string())
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("UPDATE jobs SET state = ?, lease_expires_at = NULL, last_error = ? WHERE id = ?")
                .bind(state.as_str())
                .bind(error)
                .bind(job.id.to_string())
                .execute(&self.pool)
                .await?
        };

        if result.rows_affected() == 0 {
            return Err(DomainError::JobNotFound(job.id));
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, job: JobPayload, options: EnqueueOptions) -> DomainResult<Uuid> {
        let id = Uuid::new_v4();
        let payload = serde_json::to_string(&job)?;
        let run_at = now_millis().saturating_add(duration_millis(options.delay));

        sqlx::query(
            r#"INSERT INTO jobs (id, kind, installation_id, payload, state, run_at, attempts,
                   remove_on_fail, remove_on_complete, created_at)
               VALUES (?, ?, ?, ?, 'queued', ?, 0, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(job.kind())
        .bind(job.installation_id())
        .bind(&payload)
        .bind(run_at)
        .bind(options.remove_on_fail)
        .bind(options.remove_on_complete)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(job_id = %id, kind = job.kind(), delay_ms = duration_millis(options.delay), "job enqueued");
        Ok(id)
    }
}

#[async_trait]
impl JobConsumer for SqliteJobQueue {
    async fn claim_due(&self, limit: usize, lease: Duration) -> DomainResult<Vec<QueuedJob>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let now = now_millis();
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"UPDATE jobs
               SET state = 'running', attempts = attempts + 1, lease_expires_at = ?1
               WHERE id IN (
                   SELECT id FROM jobs
                   WHERE (state = 'queued' AND run_at <= ?2)
                      OR (state = 'running' AND lease_expires_at <= ?2)
                   ORDER BY run_at, created_at
                   LIMIT ?3
               )
               RETURNING id, payload, run_at, attempts, remove_on_fail, remove_on_complete"#,
        )
        .bind(now.saturating_add(duration_millis(lease)))
        .bind(now)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut claimed = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match QueuedJob::try_from(row) {
                Ok(job) => claimed.push(job),
                Err(err) => {
                    // An unreadable payload can never succeed; drop it.
                    warn!(job_id = %id, error = %err, "discarding undecodable job");
                    sqlx::query("DELETE FROM jobs WHERE id = ?")
                        .bind(&id)
                        .execute(&self.pool)
                        .await?;
                }
            }
        }
        claimed.sort_by_key(|job| job.run_at);
        Ok(claimed)
    }

    async fn complete(&self, job: &QueuedJob) -> DomainResult<()> {
        self.settle(job, JobState::Completed, job.remove_on_complete, None).await
    }

    async fn fail(&self, job: &QueuedJob, error: &str) -> DomainResult<()> {
        self.settle(job, JobState::Failed, job.remove_on_fail, Some(error)).await
    }

    async fn counts(&self) -> DomainResult<QueueCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT state, COUNT(*) FROM jobs GROUP BY state")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = QueueCounts::default();
        for (state, count) in rows {
            match JobState::from_str(&state) {
                Some(JobState::Queued) => counts.queued = count,
                Some(JobState::Running) => counts.running = count,
                Some(JobState::Completed) => counts.completed = count,
                Some(JobState::Failed) => counts.failed = count,
                None => {}
            }
        }
        Ok(counts)
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    payload: String,
    run_at: i64,
    attempts: i64,
    remove_on_fail: bool,
    remove_on_complete: bool,
}

impl TryFrom<JobRow> for QueuedJob {
    type Error = DomainError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|e| DomainError::SerializationError(e.to_string()))?;
        let payload: JobPayload = serde_json::from_str(&row.payload)?;
        let run_at = DateTime::<Utc>::from_timestamp_millis(row.run_at)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid run_at: {}", row.run_at)))?;

        Ok(Self {
            id,
            payload,
            run_at,
            attempts: u32::try_from(row.attempts).unwrap_or(u32::MAX),
            remove_on_fail: row.remove_on_fail,
            remove_on_complete: row.remove_on_complete,
        })
    }
}
