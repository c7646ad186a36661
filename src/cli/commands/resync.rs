//! `devsync resync`: restart commit sync from the newest commit.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

use crate::cli::context::{load_config, AppContext};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{EnqueueOptions, JobPayload, SyncJob};
use crate::domain::ports::{JobQueue, SyncStateRepository};

#[derive(Args, Debug)]
pub struct ResyncArgs {
    pub installation_id: i64,

    /// Tracker base URL of the installation
    pub jira_host: String,

    /// Only this repository; every repository of the installation otherwise
    #[arg(short, long)]
    pub repository: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ResyncOutput {
    pub success: bool,
    pub repositories_reset: u64,
    /// `None` when a queued sync job already covers the reset repositories.
    pub job_id: Option<String>,
}

impl CommandOutput for ResyncOutput {
    fn to_human(&self) -> String {
        match &self.job_id {
            Some(id) => format!("Reset {} repository record(s); queued job {id}", self.repositories_reset),
            None => format!(
                "Reset {} repository record(s); an already queued sync job resumes from the start",
                self.repositories_reset
            ),
        }
    }
}

pub async fn execute(args: ResyncArgs, config: Option<&Path>, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(load_config(config)?).await?;
    let jira_host = args.jira_host.trim_end_matches('/').to_string();

    let repositories_reset = ctx
        .state
        .reset(args.installation_id, &jira_host, args.repository.as_deref())
        .await
        .context("Failed to reset sync state")?;

    let already_queued = ctx
        .queue
        .has_outstanding_sync(args.installation_id, &jira_host, args.repository.as_deref())
        .await
        .context("Failed to inspect the job queue")?;

    let job_id = if already_queued {
        None
    } else {
        let job = match args.repository {
            Some(repository_id) => SyncJob::for_repository(args.installation_id, jira_host, repository_id),
            None => SyncJob::for_installation(args.installation_id, jira_host),
        };
        let id = ctx
            .queue
            .enqueue(JobPayload::Sync(job), EnqueueOptions::default())
            .await
            .context("Failed to queue resync")?;
        Some(id.to_string())
    };

    output(
        &ResyncOutput {
            success: true,
            repositories_reset,
            job_id,
        },
        json_mode,
    );
    Ok(())
}
