//! `devsync worker`: process queued sync and push jobs.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::context::{load_config, AppContext};
use crate::cli::output::{output, CommandOutput};
use crate::services::WorkerStats;

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Process every job that is due now, then exit
    #[arg(long)]
    pub once: bool,

    /// Override the configured number of concurrent jobs
    #[arg(short, long)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub struct WorkerOutput {
    pub completed: u64,
    pub failed: u64,
    pub requeued: u64,
    pub timed_out: u64,
}

impl From<WorkerStats> for WorkerOutput {
    fn from(stats: WorkerStats) -> Self {
        Self {
            completed: stats.completed,
            failed: stats.failed,
            requeued: stats.requeued,
            timed_out: stats.timed_out,
        }
    }
}

impl CommandOutput for WorkerOutput {
    fn to_human(&self) -> String {
        format!(
            "Processed {} job(s): {} completed, {} failed, {} requeued, {} timed out",
            self.completed + self.failed + self.requeued + self.timed_out,
            self.completed,
            self.failed,
            self.requeued,
            self.timed_out
        )
    }
}

pub async fn execute(args: WorkerArgs, config: Option<&Path>, json_mode: bool) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(concurrency) = args.concurrency {
        config.worker.concurrency = concurrency.max(1);
    }
    let ctx = AppContext::open(config).await?;
    let pool = ctx.worker_pool()?;

    let stats = if args.once {
        pool.drain().await.context("Failed to drain queue")?
    } else {
        let pool = Arc::new(pool);
        let handle = pool.handle();
        let running = tokio::spawn(Arc::clone(&pool).run());

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        info!("shutdown requested; finishing in-flight jobs");
        handle.stop();
        running.await.context("Worker pool task failed")?
    };

    output(&WorkerOutput::from(stats), json_mode);
    Ok(())
}
