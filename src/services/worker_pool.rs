//! Bounded worker pool over the durable queue.
//!
//! Each claimed job runs under the configured timeout. Sync jobs that time out
//! leave their repository `failed`; every job error is settled here and never
//! escapes the pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::domain::errors::{DomainResult, SyncError};
use crate::domain::models::{EnqueueOptions, JobPayload, QueuedJob, WorkerConfig};
use crate::domain::ports::JobConsumer;
use crate::services::backoff::{millis, InstallationBackoff};
use crate::services::push_processor::{PushOutcome, PushProcessor};
use crate::services::sync_controller::JobContinuationController;

/// How a claimed job was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Completed,
    Failed,
    /// Handed back to the queue as a new delayed job.
    Requeued,
    TimedOut,
}

/// Totals of one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: u64,
    pub failed: u64,
    pub requeued: u64,
    pub timed_out: u64,
}

impl WorkerStats {
    fn record(&mut self, settlement: Settlement) {
        match settlement {
            Settlement::Completed => self.completed += 1,
            Settlement::Failed => self.failed += 1,
            Settlement::Requeued => self.requeued += 1,
            Settlement::TimedOut => self.timed_out += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.completed + self.failed + self.requeued + self.timed_out
    }
}

/// Stops a running pool after its in-flight jobs finish.
#[derive(Clone)]
pub struct WorkerHandle {
    stop_flag: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }
}

pub struct WorkerPool {
    queue: Arc<dyn JobConsumer>,
    controller: Arc<JobContinuationController>,
    push: Arc<PushProcessor>,
    backoff: Arc<InstallationBackoff>,
    config: WorkerConfig,
    stop_flag: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn JobConsumer>,
        controller: Arc<JobContinuationController>,
        push: Arc<PushProcessor>,
        backoff: Arc<InstallationBackoff>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            controller,
            push,
            backoff,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            stop_flag: self.stop_flag.clone(),
        }
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    fn lease(&self) -> Duration {
        Duration::from_secs(self.config.lease_secs)
    }

    /// Claim one batch of due jobs, run them concurrently and wait for all of
    /// them. Returns what happened to each.
    pub async fn run_once(&self) -> DomainResult<WorkerStats> {
        let claimed = self.queue.claim_due(self.concurrency(), self.lease()).await?;
        let mut stats = WorkerStats::default();
        for settlement in futures::future::join_all(claimed.into_iter().map(|job| self.execute(job))).await {
            stats.record(settlement);
        }
        Ok(stats)
    }

    /// Run until every due job has been processed, including continuations
    /// enqueued without delay along the way.
    pub async fn drain(&self) -> DomainResult<WorkerStats> {
        let mut stats = WorkerStats::default();
        loop {
            let batch = self.run_once().await?;
            if batch.total() == 0 {
                return Ok(stats);
            }
            stats.completed += batch.completed;
            stats.failed += batch.failed;
            stats.requeued += batch.requeued;
            stats.timed_out += batch.timed_out;
        }
    }

    /// Poll the queue until [`WorkerHandle::stop`] is called, keeping at most
    /// `concurrency` jobs in flight.
    pub async fn run(self: Arc<Self>) -> WorkerStats {
        let permits = Arc::new(Semaphore::new(self.concurrency()));
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut tasks: JoinSet<Settlement> = JoinSet::new();
        let mut stats = WorkerStats::default();

        info!(concurrency = self.concurrency(), "worker pool started");
        while !self.stop_flag.load(Ordering::Acquire) {
            while let Some(done) = tasks.try_join_next() {
                stats.record(settlement_of(done));
            }

            let free = permits.available_permits();
            let claimed = if free == 0 {
                Vec::new()
            } else {
                match self.queue.claim_due(free, self.lease()).await {
                    Ok(claimed) => claimed,
                    Err(err) => {
                        warn!(error = %err, "failed to claim jobs");
                        Vec::new()
                    }
                }
            };

            if claimed.is_empty() {
                sleep(poll_interval).await;
                continue;
            }

            for job in claimed {
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let pool = Arc::clone(&self);
                tasks.spawn(async move {
                    let _permit = permit;
                    pool.execute(job).await
                });
            }
        }

        while let Some(done) = tasks.join_next().await {
            stats.record(settlement_of(done));
        }
        info!(
            completed = stats.completed,
            failed = stats.failed,
            requeued = stats.requeued,
            timed_out = stats.timed_out,
            "worker pool stopped"
        );
        stats
    }

    async fn execute(&self, job: QueuedJob) -> Settlement {
        let limit = Duration::from_secs(self.config.job_timeout_secs);
        debug!(job_id = %job.id, kind = job.payload.kind(), attempts = job.attempts, "running job");

        match &job.payload {
            JobPayload::Sync(sync) => match timeout(limit, self.controller.process(sync)).await {
                Ok(Ok(outcome)) => {
                    debug!(job_id = %job.id, outcome = outcome.as_str(), "sync job finished");
                    self.settle_complete(&job).await
                }
                Ok(Err(err)) => self.settle_failed(&job, &err.to_string()).await,
                Err(_) => {
                    if let Err(err) = self.controller.mark_failed(sync).await {
                        error!(job_id = %job.id, error = %err, "could not mark timed-out repository failed");
                    }
                    self.settle_failed(&job, "job timed out").await;
                    Settlement::TimedOut
                }
            },
            JobPayload::Push(push) => match timeout(limit, self.push.process(push)).await {
                Ok(Ok(PushOutcome::Uploaded(report))) => {
                    debug!(job_id = %job.id, commits = report.commits, "push job finished");
                    self.settle_complete(&job).await
                }
                Ok(Ok(PushOutcome::InstallationGone)) => self.settle_complete(&job).await,
                Ok(Err(err @ SyncError::RateLimited { .. })) => {
                    let delay = self.backoff.on_rate_limit(push.installation_id, err.retry_after());
                    self.requeue(&job, delay).await
                }
                Ok(Err(err)) => self.settle_failed(&job, &err.to_string()).await,
                Err(_) => {
                    self.settle_failed(&job, "job timed out").await;
                    Settlement::TimedOut
                }
            },
        }
    }

    async fn settle_complete(&self, job: &QueuedJob) -> Settlement {
        if let Err(err) = self.queue.complete(job).await {
            error!(job_id = %job.id, error = %err, "failed to settle completed job");
        }
        Settlement::Completed
    }

    async fn settle_failed(&self, job: &QueuedJob, reason: &str) -> Settlement {
        error!(
            job_id = %job.id,
            kind = job.payload.kind(),
            installation_id = job.payload.installation_id(),
            reason,
            "job failed"
        );
        if let Err(err) = self.queue.fail(job, reason).await {
            error!(job_id = %job.id, error = %err, "failed to settle failed job");
        }
        Settlement::Failed
    }

    async fn requeue(&self, job: &QueuedJob, delay: Duration) -> Settlement {
        let options = EnqueueOptions {
            delay,
            remove_on_fail: job.remove_on_fail,
            remove_on_complete: job.remove_on_complete,
        };
        match self.queue.enqueue(job.payload.clone(), options).await {
            Ok(id) => {
                warn!(job_id = %job.id, requeued_as = %id, delay_ms = millis(delay), "rate limited; job requeued");
                self.settle_complete(job).await;
                Settlement::Requeued
            }
            Err(err) => self.settle_failed(job, &err.to_string()).await,
        }
    }
}

fn settlement_of(done: Result<Settlement, tokio::task::JoinError>) -> Settlement {
    done.unwrap_or_else(|err| {
        error!(error = %err, "worker task panicked");
        Settlement::Failed
    })
}
